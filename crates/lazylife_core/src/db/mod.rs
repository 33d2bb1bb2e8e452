//! Storage bootstrap, store boundary and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for LazyLife core.
//! - Expose the versioned store boundary consumed by the migration engine.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod store;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidTargetVersion {
        current: u32,
        target: u32,
    },
    SchemaNotReady {
        db_version: u32,
        expected: u32,
    },
    UnknownTable(String),
    UnknownColumn {
        table: String,
        column: String,
    },
    SchemaConflict(String),
    RowNotFound {
        table: String,
    },
    DuplicateKey {
        table: String,
    },
    MigrationStepFailed {
        version: u32,
        name: &'static str,
        source: Box<DbError>,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidTargetVersion { current, target } => write!(
                f,
                "cannot migrate from schema version {current} to {target}"
            ),
            Self::SchemaNotReady {
                db_version,
                expected,
            } => write!(
                f,
                "database schema version {db_version} is not migrated to {expected}"
            ),
            Self::UnknownTable(table) => write!(f, "unknown table `{table}`"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` in table `{table}`")
            }
            Self::SchemaConflict(message) => write!(f, "schema conflict: {message}"),
            Self::RowNotFound { table } => write!(f, "no row matched key in table `{table}`"),
            Self::DuplicateKey { table } => write!(f, "duplicate primary key in table `{table}`"),
            Self::MigrationStepFailed {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MigrationStepFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &rusqlite::Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
