//! Schema migration registry and executor.
//!
//! # Responsibility
//! - Register schema steps in strictly increasing order.
//! - Apply pending steps one at a time, each in its own exclusive transaction.
//!
//! # Invariants
//! - `version` values must remain monotonic and gapless from 1.
//! - A step and its version bump commit together or not at all.
//! - Re-running a step whose version was not recorded is safe.

use crate::db::store::{ColumnDef, Mutation, StoreTx, TableDef, VersionedStore};
use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::types::Value;
use std::time::Instant;

mod rebuild;
mod remap;
pub mod schema;

pub use rebuild::{RebuildReport, TableRebuild};
pub use remap::{encode_category_list, parse_category_list, CategoryRemap, LegacyRowError};

/// Caller-supplied migration settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    pub category_remap: CategoryRemap,
}

type RebuildStep = fn(&mut dyn StoreTx, &MigrationOptions) -> DbResult<()>;

#[derive(Clone, Copy)]
enum MigrationKind {
    CreateTables(fn() -> Vec<TableDef>),
    /// Additive: one new column with a fixed default.
    AddColumn {
        table: &'static str,
        column: fn() -> ColumnDef,
    },
    /// Structural: data-dependent rewrite followed by a table rebuild.
    Rebuild(RebuildStep),
}

#[derive(Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    kind: MigrationKind,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        kind: MigrationKind::CreateTables(schema::initial_tables),
    },
    Migration {
        version: 2,
        name: "collection_sort_order",
        kind: MigrationKind::AddColumn {
            table: schema::COLLECTIONS,
            column: schema::collection_sort_order,
        },
    },
    Migration {
        version: 3,
        name: "focus_profile_enabled",
        kind: MigrationKind::AddColumn {
            table: schema::FOCUS_PROFILES,
            column: schema::focus_profile_enabled,
        },
    },
    Migration {
        version: 4,
        name: "focus_categories_renumber",
        kind: MigrationKind::Rebuild(renumber_focus_categories),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations with default options.
pub fn apply_migrations<S: VersionedStore>(store: &mut S) -> DbResult<()> {
    apply_migrations_with(store, &MigrationOptions::default(), latest_version())
}

/// Applies pending migrations up to and including `target`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store is newer than this binary.
/// - `InvalidTargetVersion` when `target` is below the store version or above
///   the latest known version.
/// - `MigrationStepFailed` when a step fails; the store keeps the version of
///   the last committed step.
pub fn apply_migrations_with<S: VersionedStore>(
    store: &mut S,
    options: &MigrationOptions,
    target: u32,
) -> DbResult<()> {
    let current_version = store.current_schema_version()?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }
    if target < current_version || target > latest {
        return Err(DbError::InvalidTargetVersion {
            current: current_version,
            target,
        });
    }

    for migration in MIGRATIONS {
        if migration.version <= current_version || migration.version > target {
            continue;
        }
        apply_step(store, migration, options)?;
    }

    Ok(())
}

fn apply_step<S: VersionedStore>(
    store: &mut S,
    migration: &Migration,
    options: &MigrationOptions,
) -> DbResult<()> {
    let started_at = Instant::now();
    info!(
        "event=db_migrate module=db status=start version={} step={}",
        migration.version, migration.name
    );

    let result = store.with_exclusive_transaction(|tx| {
        // Another writer may have committed this step since we read the version.
        if tx.schema_version()? >= migration.version {
            return Ok(());
        }
        run_step(tx, migration, options)?;
        tx.set_schema_version(migration.version)
    });

    match result {
        Ok(()) => {
            info!(
                "event=db_migrate module=db status=ok version={} step={} duration_ms={}",
                migration.version,
                migration.name,
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=db_migrate module=db status=error version={} step={} duration_ms={} error_code=migration_step_failed error={}",
                migration.version,
                migration.name,
                started_at.elapsed().as_millis(),
                err
            );
            Err(DbError::MigrationStepFailed {
                version: migration.version,
                name: migration.name,
                source: Box::new(err),
            })
        }
    }
}

fn run_step(
    tx: &mut dyn StoreTx,
    migration: &Migration,
    options: &MigrationOptions,
) -> DbResult<()> {
    match migration.kind {
        MigrationKind::CreateTables(tables) => {
            for table in tables() {
                tx.execute(&Mutation::CreateTable(table))?;
            }
            Ok(())
        }
        MigrationKind::AddColumn { table, column } => {
            let column = column();
            if tx
                .table_columns(table)?
                .iter()
                .any(|name| name == &column.name)
            {
                return Ok(());
            }
            tx.execute(&Mutation::AddColumn {
                table: table.to_string(),
                column,
            })
        }
        MigrationKind::Rebuild(step) => step(tx, options),
    }
}

/// Merges one focus category into another and closes the freed code slot.
fn renumber_focus_categories(tx: &mut dyn StoreTx, options: &MigrationOptions) -> DbResult<()> {
    let remap = options.category_remap;
    let rebuild = TableRebuild::new(
        schema::focus_profiles_rebuilt(),
        "categories",
        Value::Text(schema::EMPTY_CATEGORY_LIST.to_string()),
        move |row| {
            let codes = match row.get("categories") {
                Some(Value::Text(raw)) => parse_category_list(raw)?,
                Some(Value::Null) | None => Default::default(),
                Some(other) => {
                    return Err(LegacyRowError {
                        message: format!("expected text, found {:?}", other.data_type()),
                    })
                }
            };
            Ok(Value::Text(encode_category_list(&remap.apply(&codes))?))
        },
    );

    let report = rebuild.run(tx)?;
    info!(
        "event=db_migrate_rebuild module=db status=ok table={} rows_rewritten={} rows_degraded={}",
        schema::FOCUS_PROFILES,
        report.rows_rewritten,
        report.rows_degraded
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, MIGRATIONS};

    #[test]
    fn versions_are_gapless_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
        assert_eq!(latest_version(), 4);
    }
}
