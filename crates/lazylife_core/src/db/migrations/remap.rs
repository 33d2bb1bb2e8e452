//! Category code renumbering for stored focus profiles.
//!
//! # Invariants
//! - Remapping is applied per row and never depends on other rows.
//! - Output is deduplicated and serialized in ascending order.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Merge and renumber constants for the category list rewrite.
///
/// The defaults are the legacy app-category layout: code `4` was merged into
/// `3`, and the freed slot at `4` is closed by shifting higher codes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRemap {
    pub merge_source: i64,
    pub merge_target: i64,
    pub removed_slot: i64,
}

impl Default for CategoryRemap {
    fn default() -> Self {
        Self {
            merge_source: 4,
            merge_target: 3,
            removed_slot: 4,
        }
    }
}

impl CategoryRemap {
    pub fn apply(&self, codes: &BTreeSet<i64>) -> BTreeSet<i64> {
        let mut merged = codes.clone();
        if merged.remove(&self.merge_source) {
            merged.insert(self.merge_target);
        }
        merged
            .into_iter()
            .map(|code| {
                if code > self.removed_slot {
                    code - 1
                } else {
                    code
                }
            })
            .collect()
    }
}

/// A stored category list that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRowError {
    pub message: String,
}

impl Display for LegacyRowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unparsable legacy category list: {}", self.message)
    }
}

impl Error for LegacyRowError {}

/// Parses a stored JSON integer list. Blank text means an empty set.
pub fn parse_category_list(raw: &str) -> Result<BTreeSet<i64>, LegacyRowError> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str::<Vec<i64>>(raw)
        .map(|codes| codes.into_iter().collect())
        .map_err(|err| LegacyRowError {
            message: err.to_string(),
        })
}

/// Serializes codes as an ascending JSON integer list.
pub fn encode_category_list(codes: &BTreeSet<i64>) -> Result<String, LegacyRowError> {
    serde_json::to_string(codes).map_err(|err| LegacyRowError {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{encode_category_list, parse_category_list, CategoryRemap};
    use std::collections::BTreeSet;

    fn set(codes: &[i64]) -> BTreeSet<i64> {
        codes.iter().copied().collect()
    }

    #[test]
    fn merge_source_becomes_merge_target() {
        let remap = CategoryRemap::default();
        assert_eq!(remap.apply(&set(&[4])), set(&[3]));
        assert_eq!(remap.apply(&set(&[3, 4])), set(&[3]));
    }

    #[test]
    fn codes_above_removed_slot_shift_down() {
        let remap = CategoryRemap::default();
        assert_eq!(remap.apply(&set(&[5, 6])), set(&[4, 5]));
        assert_eq!(remap.apply(&set(&[0, 2, 4, 8])), set(&[0, 2, 3, 7]));
        assert_eq!(remap.apply(&set(&[])), set(&[]));
    }

    #[test]
    fn custom_constants_are_honored() {
        let remap = CategoryRemap {
            merge_source: 1,
            merge_target: 0,
            removed_slot: 1,
        };
        assert_eq!(remap.apply(&set(&[1, 2, 3])), set(&[0, 1, 2]));
    }

    #[test]
    fn parse_accepts_json_lists_and_blank_text() {
        assert_eq!(parse_category_list("[5, 6, 5]").unwrap(), set(&[5, 6]));
        assert_eq!(parse_category_list("  ").unwrap(), set(&[]));
        assert!(parse_category_list("games,social").is_err());
        assert!(parse_category_list("[1.5]").is_err());
    }

    #[test]
    fn encode_sorts_ascending() {
        assert_eq!(encode_category_list(&set(&[5, 0, 3])).unwrap(), "[0,3,5]");
        assert_eq!(encode_category_list(&set(&[-1, 12])).unwrap(), "[-1,12]");
        assert_eq!(encode_category_list(&set(&[])).unwrap(), "[]");
    }

    #[test]
    fn encoded_list_parses_back() {
        let codes = set(&[0, 3, 8]);
        let encoded = encode_category_list(&codes).unwrap();
        assert_eq!(parse_category_list(&encoded).unwrap(), codes);
    }
}
