//! Textual codec for recurrence rules.
//!
//! # Responsibility
//! - Encode rules into a tagged JSON text stored next to scheduled items.
//! - Decode stored text strictly, or leniently with a `Once`-today fallback.
//!
//! # Invariants
//! - `try_decode_rule(&encode_rule(rule)) == Ok(rule)` for every valid rule.
//! - Decoded rules pass the same validation as constructed rules.
//! - Lenient decoding never fails; fallbacks are logged as `warn`.

use crate::model::recurrence::{
    DayOfMonth, EpochDay, RecurrenceRule, RecurrenceValidationError, WeekdaySet,
};
use chrono::Local;
use log::warn;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Wire shape of a stored rule. Numbers stay wide so validation, not serde,
/// reports out-of-range parameters.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoredRule {
    Once { anchor: i64 },
    EveryNDays { n: i64 },
    WeeklyOnDays { days: Vec<i64> },
    MonthlyOnDay { day: i64 },
    YearlyOnDate { anchor: i64 },
}

impl TryFrom<StoredRule> for RecurrenceRule {
    type Error = RecurrenceValidationError;

    fn try_from(value: StoredRule) -> Result<Self, Self::Error> {
        match value {
            StoredRule::Once { anchor } => Ok(Self::once(calendar_anchor(anchor)?)),
            StoredRule::EveryNDays { n } => Self::every_n_days(n),
            StoredRule::WeeklyOnDays { days } => Ok(Self::WeeklyOnDays {
                days: WeekdaySet::from_codes(days)?,
            }),
            StoredRule::MonthlyOnDay { day } => Ok(Self::MonthlyOnDay {
                day: DayOfMonth::new(day)?,
            }),
            StoredRule::YearlyOnDate { anchor } => {
                Ok(Self::yearly_on_date(calendar_anchor(anchor)?))
            }
        }
    }
}

/// Stored anchors must map to a calendar date; evaluation relies on it.
fn calendar_anchor(days: i64) -> Result<EpochDay, RecurrenceValidationError> {
    let anchor = EpochDay::new(days);
    match anchor.to_date() {
        Some(_) => Ok(anchor),
        None => Err(RecurrenceValidationError::AnchorOutOfRange(days)),
    }
}

/// Stored recurrence text could not be turned into a valid rule.
#[derive(Debug)]
pub enum RecurrenceDecodeError {
    Malformed(serde_json::Error),
    InvalidParameter(RecurrenceValidationError),
}

impl Display for RecurrenceDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed recurrence data: {err}"),
            Self::InvalidParameter(err) => write!(f, "invalid recurrence parameter: {err}"),
        }
    }
}

impl Error for RecurrenceDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::InvalidParameter(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for RecurrenceDecodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

impl From<RecurrenceValidationError> for RecurrenceDecodeError {
    fn from(value: RecurrenceValidationError) -> Self {
        Self::InvalidParameter(value)
    }
}

/// Encodes a rule as tagged JSON, e.g. `{"type":"every_n_days","n":3}`.
pub fn encode_rule(rule: &RecurrenceRule) -> String {
    let value = match rule {
        RecurrenceRule::Once { anchor } => json!({ "type": rule.tag(), "anchor": anchor.value() }),
        RecurrenceRule::EveryNDays { n } => json!({ "type": rule.tag(), "n": n.get() }),
        RecurrenceRule::WeeklyOnDays { days } => {
            json!({ "type": rule.tag(), "days": days.codes() })
        }
        RecurrenceRule::MonthlyOnDay { day } => json!({ "type": rule.tag(), "day": day.get() }),
        RecurrenceRule::YearlyOnDate { anchor } => {
            json!({ "type": rule.tag(), "anchor": anchor.value() })
        }
    };
    value.to_string()
}

/// Decodes stored text, rejecting malformed or invalid input.
pub fn try_decode_rule(text: &str) -> Result<RecurrenceRule, RecurrenceDecodeError> {
    let stored: StoredRule = serde_json::from_str(text)?;
    Ok(RecurrenceRule::try_from(stored)?)
}

/// Decodes stored text, substituting `Once { anchor: today }` on failure.
pub fn decode_rule(text: &str, today: EpochDay) -> RecurrenceRule {
    match try_decode_rule(text) {
        Ok(rule) => rule,
        Err(err) => {
            warn!(
                "event=recurrence_decode module=recurrence status=fallback error_code=malformed_recurrence_data error={}",
                err
            );
            RecurrenceRule::once(today)
        }
    }
}

/// Lenient decode anchored at the current local day.
pub fn decode_rule_or_today(text: &str) -> RecurrenceRule {
    decode_rule(text, today_local())
}

/// Current calendar day in the system time zone.
pub fn today_local() -> EpochDay {
    EpochDay::from_date(Local::now().date_naive())
}
