//! Three-phase table rebuild for column rewrites on append-only schemas.
//!
//! # Responsibility
//! - Stage a temporary column next to the column being rewritten.
//! - Rewrite every row into the staged column.
//! - Swap the table to its final shape, dropping the old column and renaming
//!   the staged one.
//!
//! # Invariants
//! - Rows are matched by primary key; key values are copied verbatim.
//! - A row whose transform fails receives the fallback value and the batch
//!   continues.
//! - All phases must run inside one exclusive transaction.

use super::remap::LegacyRowError;
use crate::db::store::{row_key, ColumnDef, Mutation, Row, StoreTx, TableDef};
use crate::db::{DbError, DbResult};
use log::warn;
use rusqlite::types::Value;

const STAGED_SUFFIX: &str = "__staged";

type RowTransform<'a> = Box<dyn Fn(&Row) -> Result<Value, LegacyRowError> + 'a>;

/// Outcome counters of a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub rows_rewritten: usize,
    pub rows_degraded: usize,
}

/// Rewrites one column of a table through a per-row transform.
pub struct TableRebuild<'a> {
    target: TableDef,
    column: String,
    fallback: Value,
    transform: RowTransform<'a>,
}

impl<'a> TableRebuild<'a> {
    /// `target` is the final table shape; it must contain `column`.
    pub fn new<F>(target: TableDef, column: impl Into<String>, fallback: Value, transform: F) -> Self
    where
        F: Fn(&Row) -> Result<Value, LegacyRowError> + 'a,
    {
        Self {
            target,
            column: column.into(),
            fallback,
            transform: Box::new(transform),
        }
    }

    pub fn staged_column(&self) -> String {
        format!("{}{STAGED_SUFFIX}", self.column)
    }

    /// Phase 1: adds the staged column unless a previous attempt already did.
    pub fn stage(&self, tx: &mut dyn StoreTx) -> DbResult<()> {
        let staged = self.staged_column();
        if tx
            .table_columns(&self.target.name)?
            .iter()
            .any(|name| name == &staged)
        {
            return Ok(());
        }
        let kind = self.target_column()?.kind;
        tx.execute(&Mutation::AddColumn {
            table: self.target.name.clone(),
            column: ColumnDef::new(staged, kind),
        })
    }

    /// Phase 2: writes the transformed value of every row into the staged column.
    pub fn rewrite(&self, tx: &mut dyn StoreTx) -> DbResult<RebuildReport> {
        let staged = self.staged_column();
        let mut report = RebuildReport::default();

        for (index, row) in tx.read_all_rows(&self.target.name)?.iter().enumerate() {
            let value = match (self.transform)(row) {
                Ok(value) => value,
                Err(err) => {
                    warn!(
                        "event=migration_row_degraded module=db status=degraded table={} row_index={} error_code=unparsable_legacy_row error={}",
                        self.target.name, index, err
                    );
                    report.rows_degraded += 1;
                    self.fallback.clone()
                }
            };
            tx.execute(&Mutation::UpdateCell {
                table: self.target.name.clone(),
                key: row_key(row, &self.target.primary_key),
                column: staged.clone(),
                value,
            })?;
            report.rows_rewritten += 1;
        }

        Ok(report)
    }

    /// Phase 3: rebuilds the table without the old column; the staged column
    /// takes its name.
    pub fn swap(&self, tx: &mut dyn StoreTx) -> DbResult<()> {
        let staged = self.staged_column();
        let copy = self
            .target
            .columns
            .iter()
            .map(|column| {
                let source = if column.name == self.column {
                    staged.clone()
                } else {
                    column.name.clone()
                };
                (column.name.clone(), source)
            })
            .collect();
        tx.execute(&Mutation::SwapTable {
            table: self.target.clone(),
            copy,
        })
    }

    /// Runs all three phases in order.
    pub fn run(&self, tx: &mut dyn StoreTx) -> DbResult<RebuildReport> {
        self.stage(tx)?;
        let report = self.rewrite(tx)?;
        self.swap(tx)?;
        Ok(report)
    }

    fn target_column(&self) -> DbResult<&ColumnDef> {
        self.target
            .columns
            .iter()
            .find(|column| column.name == self.column)
            .ok_or_else(|| DbError::UnknownColumn {
                table: self.target.name.clone(),
                column: self.column.clone(),
            })
    }
}
