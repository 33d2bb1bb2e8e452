//! Scheduled item domain model (events and habits).
//!
//! # Responsibility
//! - Define collections, scheduled items and completion instance records.
//! - Provide declaration-level validation before persistence.
//!
//! # Invariants
//! - `id` values are opaque, stable and never reused.
//! - `start_at_ms` is an absolute instant; calendar dates are derived from it
//!   through a time zone at evaluation time.
//! - Completion is tracked only through `InstanceRecord` existence, never by
//!   mutating the scheduled item.

use crate::model::recurrence::{EpochDay, RecurrenceRule};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Kind of scheduled item sharing the recurrence engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Event,
    Habit,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Habit => "habit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "event" => Some(Self::Event),
            "habit" => Some(Self::Habit),
            _ => None,
        }
    }
}

/// Owning collection of scheduled items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    /// Display order among sibling collections.
    pub sort_order: i64,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            sort_order: 0,
        }
    }
}

/// Event or habit evaluated by the recurrence engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledItem {
    pub id: String,
    pub collection_id: String,
    pub kind: ItemKind,
    pub title: String,
    pub description: String,
    /// Unix epoch milliseconds.
    pub start_at_ms: i64,
    /// Unix epoch milliseconds. Should be >= `start_at_ms` when set.
    pub end_at_ms: Option<i64>,
    pub recurrence: RecurrenceRule,
}

impl ScheduledItem {
    /// Creates an item with a generated stable ID.
    pub fn new(
        collection_id: impl Into<String>,
        kind: ItemKind,
        title: impl Into<String>,
        start_at_ms: i64,
        recurrence: RecurrenceRule,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection_id: collection_id.into(),
            kind,
            title: title.into(),
            description: String::new(),
            start_at_ms,
            end_at_ms: None,
            recurrence,
        }
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.id.trim().is_empty() {
            return Err(ItemValidationError::EmptyId);
        }
        if self.collection_id.trim().is_empty() {
            return Err(ItemValidationError::EmptyCollectionId);
        }
        if self.title.trim().is_empty() {
            return Err(ItemValidationError::EmptyTitle);
        }
        if let Some(end) = self.end_at_ms {
            if end < self.start_at_ms {
                return Err(ItemValidationError::EndBeforeStart {
                    start: self.start_at_ms,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// Durable marker that one occurrence of an item was completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceRecord {
    pub item_id: String,
    pub collection_id: String,
    pub instance_date: EpochDay,
}

impl InstanceRecord {
    pub fn for_item(item: &ScheduledItem, instance_date: EpochDay) -> Self {
        Self {
            item_id: item.id.clone(),
            collection_id: item.collection_id.clone(),
            instance_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyId,
    EmptyCollectionId,
    EmptyTitle,
    EndBeforeStart { start: i64, end: i64 },
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "scheduled item id cannot be empty"),
            Self::EmptyCollectionId => write!(f, "scheduled item collection id cannot be empty"),
            Self::EmptyTitle => write!(f, "scheduled item title cannot be empty"),
            Self::EndBeforeStart { start, end } => {
                write!(f, "end_at_ms ({end}) is earlier than start_at_ms ({start})")
            }
        }
    }
}

impl Error for ItemValidationError {}
