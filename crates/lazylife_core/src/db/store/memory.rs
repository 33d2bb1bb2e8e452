//! In-memory versioned store.
//!
//! Used to exercise migration steps without SQLite. Foreign keys are recorded
//! but not enforced; primary key uniqueness is.

use super::{row_key, Mutation, Row, StoreTx, TableDef, VersionedStore};
use crate::db::{DbError, DbResult};
use rusqlite::types::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct MemoryTable {
    def: TableDef,
    rows: Vec<Row>,
}

/// Table name -> ordered rows, tagged with a schema version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
    version: u32,
    tables: BTreeMap<String, MemoryTable>,
}

impl MemorySnapshot {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Rows of `table`, or `None` when the table does not exist.
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(|table| table.rows.as_slice())
    }

    pub fn table_def(&self, table: &str) -> Option<&TableDef> {
        self.tables.get(table).map(|table| &table.def)
    }

    fn table(&self, table: &str) -> DbResult<&MemoryTable> {
        self.tables
            .get(table)
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }

    fn table_mut(&mut self, table: &str) -> DbResult<&mut MemoryTable> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }
}

impl StoreTx for MemorySnapshot {
    fn schema_version(&self) -> DbResult<u32> {
        Ok(self.version)
    }

    fn set_schema_version(&mut self, version: u32) -> DbResult<()> {
        self.version = version;
        Ok(())
    }

    fn read_all_rows(&self, table: &str) -> DbResult<Vec<Row>> {
        Ok(self.table(table)?.rows.clone())
    }

    fn table_columns(&self, table: &str) -> DbResult<Vec<String>> {
        Ok(self.table(table)?.def.column_names())
    }

    fn execute(&mut self, mutation: &Mutation) -> DbResult<()> {
        match mutation {
            Mutation::CreateTable(def) => {
                if self.tables.contains_key(&def.name) {
                    return Err(DbError::SchemaConflict(format!(
                        "table `{}` already exists",
                        def.name
                    )));
                }
                self.tables.insert(
                    def.name.clone(),
                    MemoryTable {
                        def: def.clone(),
                        rows: Vec::new(),
                    },
                );
            }
            Mutation::AddColumn { table, column } => {
                let target = self.table_mut(table)?;
                if target.def.columns.iter().any(|c| c.name == column.name) {
                    return Err(DbError::SchemaConflict(format!(
                        "column `{}` already exists in `{table}`",
                        column.name
                    )));
                }
                let fill = column.default.clone().unwrap_or(Value::Null);
                for row in &mut target.rows {
                    row.insert(column.name.clone(), fill.clone());
                }
                target.def.columns.push(column.clone());
            }
            Mutation::InsertRow { table, row } => {
                let target = self.table_mut(table)?;
                let mut record = Row::new();
                for column in &target.def.columns {
                    let value = row
                        .get(&column.name)
                        .or(column.default.as_ref())
                        .cloned()
                        .unwrap_or(Value::Null);
                    record.insert(column.name.clone(), value);
                }
                if let Some(unknown) = row.keys().find(|name| !record.contains_key(*name)) {
                    return Err(DbError::UnknownColumn {
                        table: table.clone(),
                        column: unknown.clone(),
                    });
                }
                let key = row_key(&record, &target.def.primary_key);
                if !key.is_empty() && target.rows.iter().any(|existing| matches_key(existing, &key))
                {
                    return Err(DbError::DuplicateKey {
                        table: table.clone(),
                    });
                }
                target.rows.push(record);
            }
            Mutation::UpdateCell {
                table,
                key,
                column,
                value,
            } => {
                let target = self.table_mut(table)?;
                if !target.def.columns.iter().any(|c| &c.name == column) {
                    return Err(DbError::UnknownColumn {
                        table: table.clone(),
                        column: column.clone(),
                    });
                }
                let mut changed = 0usize;
                for row in target.rows.iter_mut().filter(|row| matches_key(row, key)) {
                    row.insert(column.clone(), value.clone());
                    changed += 1;
                }
                if changed == 0 {
                    return Err(DbError::RowNotFound {
                        table: table.clone(),
                    });
                }
            }
            Mutation::SwapTable { table: def, copy } => {
                let source = self.table(&def.name)?;
                for (target_column, source_column) in copy {
                    if !source.def.columns.iter().any(|c| &c.name == source_column) {
                        return Err(DbError::UnknownColumn {
                            table: def.name.clone(),
                            column: source_column.clone(),
                        });
                    }
                    if !def.columns.iter().any(|c| &c.name == target_column) {
                        return Err(DbError::UnknownColumn {
                            table: def.name.clone(),
                            column: target_column.clone(),
                        });
                    }
                }

                let rows = source
                    .rows
                    .iter()
                    .map(|row| {
                        def.columns
                            .iter()
                            .map(|column| {
                                let value = copy
                                    .iter()
                                    .find(|(target_column, _)| target_column == &column.name)
                                    .and_then(|(_, source_column)| row.get(source_column))
                                    .or(column.default.as_ref())
                                    .cloned()
                                    .unwrap_or(Value::Null);
                                (column.name.clone(), value)
                            })
                            .collect::<Row>()
                    })
                    .collect();

                self.tables.insert(
                    def.name.clone(),
                    MemoryTable {
                        def: def.clone(),
                        rows,
                    },
                );
            }
        }
        Ok(())
    }
}

fn matches_key(row: &Row, key: &[(String, Value)]) -> bool {
    key.iter()
        .all(|(column, value)| row.get(column) == Some(value))
}

/// Store holding a [`MemorySnapshot`].
///
/// A transaction works on a copy of the snapshot that replaces the current one
/// only when the body succeeds.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: MemorySnapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &MemorySnapshot {
        &self.snapshot
    }
}

impl VersionedStore for MemoryStore {
    fn current_schema_version(&self) -> DbResult<u32> {
        Ok(self.snapshot.version)
    }

    fn with_exclusive_transaction<T, F>(&mut self, body: F) -> DbResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> DbResult<T>,
    {
        let mut working = self.snapshot.clone();
        let value = body(&mut working)?;
        self.snapshot = working;
        Ok(value)
    }
}
