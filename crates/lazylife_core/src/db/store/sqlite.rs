//! SQLite adapter for the versioned store boundary.
//!
//! # Invariants
//! - Transactions use `TransactionBehavior::Exclusive`, so readers see either
//!   the pre-step or the post-step schema.
//! - Schema version lives in `PRAGMA user_version` and is written inside the
//!   same transaction as the step it records.

use super::{ColumnDef, Mutation, Row, StoreTx, TableDef, VersionedStore};
use crate::db::{schema_version, DbError, DbResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};

const REBUILD_SUFFIX: &str = "__rebuild";

/// Versioned store over a borrowed SQLite connection.
pub struct SqliteStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl VersionedStore for SqliteStore<'_> {
    fn current_schema_version(&self) -> DbResult<u32> {
        schema_version(&*self.conn)
    }

    fn with_exclusive_transaction<T, F>(&mut self, body: F) -> DbResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> DbResult<T>,
    {
        let mut tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;
        // Dropping `tx` on error rolls the whole step back.
        let value = body(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl StoreTx for Transaction<'_> {
    fn schema_version(&self) -> DbResult<u32> {
        schema_version(self)
    }

    fn set_schema_version(&mut self, version: u32) -> DbResult<()> {
        self.execute_batch(&format!("PRAGMA user_version = {version};"))?;
        Ok(())
    }

    fn read_all_rows(&self, table: &str) -> DbResult<Vec<Row>> {
        ensure_table(self, table)?;
        let mut stmt = self.prepare(&format!(
            "SELECT * FROM {} ORDER BY rowid;",
            quote_ident(table)
        ))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                record.insert(column.clone(), row.get::<_, Value>(index)?);
            }
            out.push(record);
        }
        Ok(out)
    }

    fn table_columns(&self, table: &str) -> DbResult<Vec<String>> {
        ensure_table(self, table)?;
        let mut stmt = self.prepare(&format!("PRAGMA table_info({});", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn execute(&mut self, mutation: &Mutation) -> DbResult<()> {
        match mutation {
            Mutation::CreateTable(table) => {
                self.execute_batch(&create_table_sql(table, &table.name))?;
            }
            Mutation::AddColumn { table, column } => {
                ensure_table(self, table)?;
                self.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {};",
                    quote_ident(table),
                    column_sql(column)
                ))?;
            }
            Mutation::InsertRow { table, row } => {
                ensure_table(self, table)?;
                let columns = row
                    .keys()
                    .map(|column| quote_ident(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = (1..=row.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Connection::execute(
                    &**self,
                    &format!(
                        "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                        quote_ident(table)
                    ),
                    params_from_iter(row.values()),
                )?;
            }
            Mutation::UpdateCell {
                table,
                key,
                column,
                value,
            } => {
                ensure_table(self, table)?;
                let predicate = key
                    .iter()
                    .enumerate()
                    .map(|(index, (key_column, _))| {
                        format!("{} = ?{}", quote_ident(key_column), index + 2)
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let mut bind_values = vec![value.clone()];
                bind_values.extend(key.iter().map(|(_, key_value)| key_value.clone()));

                let changed = Connection::execute(
                    &**self,
                    &format!(
                        "UPDATE {} SET {} = ?1 WHERE {predicate};",
                        quote_ident(table),
                        quote_ident(column)
                    ),
                    params_from_iter(bind_values),
                )?;
                if changed == 0 {
                    return Err(DbError::RowNotFound {
                        table: table.clone(),
                    });
                }
            }
            Mutation::SwapTable { table, copy } => {
                ensure_table(self, &table.name)?;
                let staging = format!("{}{REBUILD_SUFFIX}", table.name);
                let targets = copy
                    .iter()
                    .map(|(target, _)| quote_ident(target))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sources = copy
                    .iter()
                    .map(|(_, source)| quote_ident(source))
                    .collect::<Vec<_>>()
                    .join(", ");

                self.execute_batch(&create_table_sql(table, &staging))?;
                self.execute_batch(&format!(
                    "INSERT INTO {} ({targets}) SELECT {sources} FROM {} ORDER BY rowid;
                     DROP TABLE {};
                     ALTER TABLE {} RENAME TO {};",
                    quote_ident(&staging),
                    quote_ident(&table.name),
                    quote_ident(&table.name),
                    quote_ident(&staging),
                    quote_ident(&table.name),
                ))?;
            }
        }
        Ok(())
    }
}

fn ensure_table(conn: &Connection, table: &str) -> DbResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(DbError::UnknownTable(table.to_string()))
    }
}

fn create_table_sql(table: &TableDef, name: &str) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(column_sql).collect();
    if !table.primary_key.is_empty() {
        parts.push(format!(
            "PRIMARY KEY ({})",
            table
                .primary_key
                .iter()
                .map(|column| quote_ident(column))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    for foreign_key in &table.foreign_keys {
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            quote_ident(&foreign_key.column),
            quote_ident(&foreign_key.parent_table),
            quote_ident(&foreign_key.parent_column)
        );
        if foreign_key.on_delete_cascade {
            clause.push_str(" ON DELETE CASCADE");
        }
        parts.push(clause);
    }
    format!(
        "CREATE TABLE {} (\n    {}\n);",
        quote_ident(name),
        parts.join(",\n    ")
    )
}

fn column_sql(column: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.kind.sql_name());
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&sql_literal(default));
    }
    sql
}

/// DDL cannot bind parameters, so defaults are rendered as literals.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => format!("{number:?}"),
        Value::Text(text) => format!("'{}'", text.replace('\'', "''")),
        Value::Blob(bytes) => {
            let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::{create_table_sql, sql_literal};
    use crate::db::store::{ColumnDef, ColumnType, ForeignKey, TableDef};
    use rusqlite::types::Value;

    #[test]
    fn renders_composite_primary_key_and_cascade() {
        let table = TableDef::new("item_instances")
            .column(ColumnDef::new("item_id", ColumnType::Text).not_null())
            .column(ColumnDef::new("instance_date", ColumnType::Integer).not_null())
            .primary_key(["item_id", "instance_date"])
            .foreign_key(ForeignKey::cascade("item_id", "scheduled_items", "id"));

        let sql = create_table_sql(&table, "item_instances");
        assert!(sql.contains("PRIMARY KEY (\"item_id\", \"instance_date\")"));
        assert!(sql.contains(
            "FOREIGN KEY (\"item_id\") REFERENCES \"scheduled_items\"(\"id\") ON DELETE CASCADE"
        ));
    }

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(sql_literal(&Value::Text("it's".to_string())), "'it''s'");
        assert_eq!(sql_literal(&Value::Integer(-4)), "-4");
        assert_eq!(sql_literal(&Value::Blob(vec![0xAB, 0x01])), "X'AB01'");
    }
}
