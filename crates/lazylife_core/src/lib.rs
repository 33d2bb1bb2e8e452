//! Core domain logic for LazyLife.
//!
//! Owns the two correctness-critical engines of the app: schema migration
//! of the persisted store and recurrence evaluation for events and habits.

pub mod db;
pub mod logging;
pub mod model;
pub mod recurrence;
pub mod repo;
pub mod service;

pub use db::migrations::{apply_migrations, apply_migrations_with, latest_version, MigrationOptions};
pub use db::{open_db, open_db_in_memory, schema_version, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig};
pub use model::recurrence::{EpochDay, RecurrenceRule, RecurrenceValidationError, WeekdaySet};
pub use model::schedule::{
    Collection, InstanceRecord, ItemKind, ItemValidationError, ScheduledItem,
};
pub use repo::schedule_repo::{
    RepoError, RepoResult, ScheduleRepository, SqliteScheduleRepository,
};
pub use service::schedule_service::{DueItem, ScheduleItemRequest, ScheduleService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
