//! Scheduled item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over collections, scheduled items and
//!   completion instances.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `ScheduledItem::validate()` before SQL mutations.
//! - Upserts update in place; they never delete-and-reinsert, so instance
//!   rows are not cascaded away.
//! - Stored recurrence text decodes leniently (`Once`-today fallback).

use crate::db::migrations::latest_version;
use crate::db::{schema_version, DbError};
use crate::model::recurrence::EpochDay;
use crate::model::schedule::{
    Collection, InstanceRecord, ItemKind, ItemValidationError, ScheduledItem,
};
use crate::recurrence::codec::{decode_rule_or_today, encode_rule};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    collection_id,
    kind,
    title,
    description,
    start_at,
    end_at,
    recurrence
FROM scheduled_items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for schedule persistence and use-case checks.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    NotFound(String),
    InvalidData(String),
    NotAnOccurrence { item_id: String, date: EpochDay },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::NotAnOccurrence { item_id, date } => {
                write!(f, "{date} is not an occurrence of item {item_id}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::NotAnOccurrence { .. } => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for scheduled items and completion instances.
pub trait ScheduleRepository {
    fn upsert_collection(&self, collection: &Collection) -> RepoResult<()>;
    /// Deletes a collection together with its items and instances.
    fn delete_collection(&self, collection_id: &str) -> RepoResult<()>;
    fn upsert_item(&self, item: &ScheduledItem) -> RepoResult<()>;
    fn delete_item(&self, item_id: &str) -> RepoResult<()>;
    fn get_item(&self, item_id: &str) -> RepoResult<Option<ScheduledItem>>;
    fn list_by_collection(&self, collection_id: &str) -> RepoResult<Vec<ScheduledItem>>;
    /// Records completion; inserting an existing record is a no-op.
    fn insert_instance(&self, instance: &InstanceRecord) -> RepoResult<()>;
    fn delete_instance(&self, item_id: &str, instance_date: EpochDay) -> RepoResult<()>;
    fn instance_exists(&self, item_id: &str, instance_date: EpochDay) -> RepoResult<bool>;
    fn list_instances(&self, item_id: &str) -> RepoResult<Vec<InstanceRecord>>;
}

/// SQLite-backed schedule repository.
pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    /// Constructs a repository from a fully migrated connection.
    ///
    /// # Errors
    /// Returns `SchemaNotReady` when the connection was not opened through
    /// `open_db*` or its migrations are behind.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let db_version = schema_version(conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(DbError::SchemaNotReady {
                db_version,
                expected,
            }
            .into());
        }
        Ok(Self { conn })
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn upsert_collection(&self, collection: &Collection) -> RepoResult<()> {
        if collection.id.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "collection id cannot be empty".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO collections (id, name, sort_order)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                sort_order = excluded.sort_order;",
            params![
                collection.id.as_str(),
                collection.name.as_str(),
                collection.sort_order
            ],
        )?;
        Ok(())
    }

    fn delete_collection(&self, collection_id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM collections WHERE id = ?1;", [collection_id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(collection_id.to_string()));
        }
        Ok(())
    }

    fn upsert_item(&self, item: &ScheduledItem) -> RepoResult<()> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO scheduled_items (
                id,
                collection_id,
                kind,
                title,
                description,
                start_at,
                end_at,
                recurrence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                collection_id = excluded.collection_id,
                kind = excluded.kind,
                title = excluded.title,
                description = excluded.description,
                start_at = excluded.start_at,
                end_at = excluded.end_at,
                recurrence = excluded.recurrence;",
            params![
                item.id.as_str(),
                item.collection_id.as_str(),
                item.kind.as_str(),
                item.title.as_str(),
                item.description.as_str(),
                item.start_at_ms,
                item.end_at_ms,
                encode_rule(&item.recurrence),
            ],
        )?;
        Ok(())
    }

    fn delete_item(&self, item_id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM scheduled_items WHERE id = ?1;", [item_id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(item_id.to_string()));
        }
        Ok(())
    }

    fn get_item(&self, item_id: &str) -> RepoResult<Option<ScheduledItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([item_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_by_collection(&self, collection_id: &str) -> RepoResult<Vec<ScheduledItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE collection_id = ?1
             ORDER BY start_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([collection_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn insert_instance(&self, instance: &InstanceRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO item_instances (item_id, collection_id, instance_date)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id, instance_date) DO NOTHING;",
            params![
                instance.item_id.as_str(),
                instance.collection_id.as_str(),
                instance.instance_date.value(),
            ],
        )?;
        Ok(())
    }

    fn delete_instance(&self, item_id: &str, instance_date: EpochDay) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM item_instances WHERE item_id = ?1 AND instance_date = ?2;",
            params![item_id, instance_date.value()],
        )?;
        Ok(())
    }

    fn instance_exists(&self, item_id: &str, instance_date: EpochDay) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM item_instances WHERE item_id = ?1 AND instance_date = ?2;",
                params![item_id, instance_date.value()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_instances(&self, item_id: &str) -> RepoResult<Vec<InstanceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, collection_id, instance_date
             FROM item_instances
             WHERE item_id = ?1
             ORDER BY instance_date ASC;",
        )?;
        let instances = stmt
            .query_map([item_id], |row| {
                Ok(InstanceRecord {
                    item_id: row.get("item_id")?,
                    collection_id: row.get("collection_id")?,
                    instance_date: EpochDay::new(row.get("instance_date")?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(instances)
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ScheduledItem> {
    let kind_text: String = row.get("kind")?;
    let kind = ItemKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid item kind `{kind_text}` in scheduled_items.kind"
        ))
    })?;
    let recurrence_text: String = row.get("recurrence")?;

    let item = ScheduledItem {
        id: row.get("id")?,
        collection_id: row.get("collection_id")?,
        kind,
        title: row.get("title")?,
        description: row.get("description")?,
        start_at_ms: row.get("start_at")?,
        end_at_ms: row.get("end_at")?,
        recurrence: decode_rule_or_today(&recurrence_text),
    };
    item.validate()?;
    Ok(item)
}
