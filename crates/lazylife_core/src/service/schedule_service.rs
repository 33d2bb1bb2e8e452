//! Schedule use-case service.
//!
//! # Responsibility
//! - Combine repository reads with recurrence evaluation for "due on day"
//!   and calendar range queries.
//! - Toggle completion only for dates that are real occurrences.
//!
//! # Invariants
//! - Completion state is instance-record existence; items are never mutated
//!   to track it.
//! - Changing a recurrence rule replaces the whole rule value.

use crate::model::recurrence::{EpochDay, RecurrenceRule};
use crate::model::schedule::{Collection, ItemKind, ScheduledItem};
use crate::recurrence::eval::{completion_record, occurrences_in_range_in, occurs_on_in};
use crate::repo::schedule_repo::{RepoError, RepoResult, ScheduleRepository};
use chrono::{Local, TimeZone};

/// Request model for scheduling an event or habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleItemRequest {
    pub collection_id: String,
    pub kind: ItemKind,
    pub title: String,
    pub description: String,
    /// Start instant in epoch milliseconds.
    pub start_at_ms: i64,
    pub end_at_ms: Option<i64>,
    pub recurrence: RecurrenceRule,
}

/// One item due on a queried day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueItem {
    pub item: ScheduledItem,
    pub completed: bool,
}

/// Use-case service over a schedule repository.
///
/// Calendar dates are derived in `Tz`; `new` uses the system time zone.
pub struct ScheduleService<R: ScheduleRepository, Tz: TimeZone = Local> {
    repo: R,
    tz: Tz,
}

impl<R: ScheduleRepository> ScheduleService<R, Local> {
    pub fn new(repo: R) -> Self {
        Self { repo, tz: Local }
    }
}

impl<R: ScheduleRepository, Tz: TimeZone> ScheduleService<R, Tz> {
    pub fn with_time_zone(repo: R, tz: Tz) -> Self {
        Self { repo, tz }
    }

    pub fn create_collection(&self, name: impl Into<String>) -> RepoResult<String> {
        let collection = Collection::new(name);
        self.repo.upsert_collection(&collection)?;
        Ok(collection.id)
    }

    /// Creates an item and returns its stable ID.
    pub fn schedule_item(&self, request: &ScheduleItemRequest) -> RepoResult<String> {
        let mut item = ScheduledItem::new(
            request.collection_id.clone(),
            request.kind,
            request.title.clone(),
            request.start_at_ms,
            request.recurrence.clone(),
        );
        item.description = request.description.clone();
        item.end_at_ms = request.end_at_ms;
        self.repo.upsert_item(&item)?;
        Ok(item.id)
    }

    /// Replaces the recurrence rule of an existing item.
    pub fn replace_recurrence(&self, item_id: &str, rule: RecurrenceRule) -> RepoResult<()> {
        let mut item = self.require_item(item_id)?;
        item.recurrence = rule;
        self.repo.upsert_item(&item)
    }

    /// Items of a collection occurring on `date`, with completion state.
    pub fn due_on(&self, collection_id: &str, date: EpochDay) -> RepoResult<Vec<DueItem>> {
        let mut due = Vec::new();
        for item in self.repo.list_by_collection(collection_id)? {
            if !occurs_on_in(&item, date, &self.tz) {
                continue;
            }
            let completed = self.repo.instance_exists(&item.id, date)?;
            due.push(DueItem { item, completed });
        }
        Ok(due)
    }

    /// Occurrence days of an item within `[from, to]`.
    pub fn occurrences(
        &self,
        item_id: &str,
        from: EpochDay,
        to: EpochDay,
    ) -> RepoResult<Vec<EpochDay>> {
        let item = self.require_item(item_id)?;
        Ok(occurrences_in_range_in(&item, from, to, &self.tz).collect())
    }

    /// Flips completion of one occurrence and returns the new state.
    ///
    /// # Errors
    /// Returns `NotAnOccurrence` when `date` is not an occurrence of the item.
    pub fn toggle_completion(&self, item_id: &str, date: EpochDay) -> RepoResult<bool> {
        let item = self.require_item(item_id)?;
        let record = completion_record(&item, date, &self.tz).ok_or_else(|| {
            RepoError::NotAnOccurrence {
                item_id: item_id.to_string(),
                date,
            }
        })?;

        if self.repo.instance_exists(&item.id, date)? {
            self.repo.delete_instance(&item.id, date)?;
            Ok(false)
        } else {
            self.repo.insert_instance(&record)?;
            Ok(true)
        }
    }

    fn require_item(&self, item_id: &str) -> RepoResult<ScheduledItem> {
        self.repo
            .get_item(item_id)?
            .ok_or_else(|| RepoError::NotFound(item_id.to_string()))
    }
}
