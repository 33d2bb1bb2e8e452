//! Versioned record store boundary.
//!
//! # Responsibility
//! - Describe tables and schema changes as structured data instead of SQL text.
//! - Define the read/write capabilities the migration engine needs.
//!
//! # Invariants
//! - Every mutation runs inside `VersionedStore::with_exclusive_transaction`.
//! - A transaction body returning `Err` leaves no trace in the store.
//! - Rows keep their primary key values across `SwapTable`.

use crate::db::DbResult;
use rusqlite::types::Value;
use std::collections::BTreeMap;

mod memory;
mod sqlite;

pub use memory::{MemorySnapshot, MemoryStore};
pub use sqlite::SqliteStore;

/// One stored row: column name -> raw value.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    pub(crate) fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnType,
    pub not_null: bool,
    pub default: Option<Value>,
}

impl ColumnDef {
    /// Nullable column without default.
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            not_null: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
    pub on_delete_cascade: bool,
}

impl ForeignKey {
    pub fn cascade(
        column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            parent_table: parent_table.into(),
            parent_column: parent_column.into(),
            on_delete_cascade: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

/// Structured store statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateTable(TableDef),
    /// Appends a column; existing rows receive the column default (or NULL).
    AddColumn { table: String, column: ColumnDef },
    InsertRow { table: String, row: Row },
    /// Sets one column on the row whose primary key equals `key`.
    UpdateCell {
        table: String,
        key: Vec<(String, Value)>,
        column: String,
        value: Value,
    },
    /// Rebuilds `table.name` with exactly `table.columns`.
    ///
    /// `copy` maps each target column to the existing column it is filled
    /// from. The old table is replaced atomically within the transaction.
    /// Tables referenced by other tables' foreign keys must not be swapped.
    SwapTable {
        table: TableDef,
        copy: Vec<(String, String)>,
    },
}

/// Operations available inside an exclusive transaction.
pub trait StoreTx {
    fn schema_version(&self) -> DbResult<u32>;
    fn set_schema_version(&mut self, version: u32) -> DbResult<()>;
    /// Rows in storage order.
    fn read_all_rows(&self, table: &str) -> DbResult<Vec<Row>>;
    /// Column names in declaration order.
    fn table_columns(&self, table: &str) -> DbResult<Vec<String>>;
    fn execute(&mut self, mutation: &Mutation) -> DbResult<()>;
}

/// Store handle that owns the transaction boundary.
pub trait VersionedStore {
    fn current_schema_version(&self) -> DbResult<u32>;

    /// Runs `body` with exclusive access.
    ///
    /// Commits only when `body` returns `Ok`; otherwise every change made by
    /// `body` (including a version bump) is discarded.
    fn with_exclusive_transaction<T, F>(&mut self, body: F) -> DbResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> DbResult<T>;
}

/// Extracts the primary key values of `row` for `UpdateCell`.
pub(crate) fn row_key(row: &Row, primary_key: &[String]) -> Vec<(String, Value)> {
    primary_key
        .iter()
        .map(|column| {
            (
                column.clone(),
                row.get(column).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}
