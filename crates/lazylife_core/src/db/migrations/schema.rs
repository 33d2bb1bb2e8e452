//! Table definitions referenced by migration steps.

use crate::db::store::{ColumnDef, ColumnType, ForeignKey, TableDef};
use rusqlite::types::Value;

pub const COLLECTIONS: &str = "collections";
pub const SCHEDULED_ITEMS: &str = "scheduled_items";
pub const ITEM_INSTANCES: &str = "item_instances";
pub const FOCUS_PROFILES: &str = "focus_profiles";

/// Stored form of an empty category list.
pub const EMPTY_CATEGORY_LIST: &str = "[]";

/// Version 1 tables.
pub(crate) fn initial_tables() -> Vec<TableDef> {
    vec![
        TableDef::new(COLLECTIONS)
            .column(ColumnDef::new("id", ColumnType::Text).not_null())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
            .primary_key(["id"]),
        TableDef::new(SCHEDULED_ITEMS)
            .column(ColumnDef::new("id", ColumnType::Text).not_null())
            .column(ColumnDef::new("collection_id", ColumnType::Text).not_null())
            .column(ColumnDef::new("kind", ColumnType::Text).not_null())
            .column(ColumnDef::new("title", ColumnType::Text).not_null())
            .column(
                ColumnDef::new("description", ColumnType::Text)
                    .not_null()
                    .default_value(Value::Text(String::new())),
            )
            .column(ColumnDef::new("start_at", ColumnType::Integer).not_null())
            .column(ColumnDef::new("end_at", ColumnType::Integer))
            .column(ColumnDef::new("recurrence", ColumnType::Text).not_null())
            .primary_key(["id"])
            .foreign_key(ForeignKey::cascade("collection_id", COLLECTIONS, "id")),
        TableDef::new(ITEM_INSTANCES)
            .column(ColumnDef::new("item_id", ColumnType::Text).not_null())
            .column(ColumnDef::new("collection_id", ColumnType::Text).not_null())
            .column(ColumnDef::new("instance_date", ColumnType::Integer).not_null())
            .primary_key(["item_id", "instance_date"])
            .foreign_key(ForeignKey::cascade("item_id", SCHEDULED_ITEMS, "id"))
            .foreign_key(ForeignKey::cascade("collection_id", COLLECTIONS, "id")),
        TableDef::new(FOCUS_PROFILES)
            .column(ColumnDef::new("id", ColumnType::Text).not_null())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
            .column(categories_column())
            .primary_key(["id"]),
    ]
}

/// Version 2: manual ordering of collections.
pub(crate) fn collection_sort_order() -> ColumnDef {
    ColumnDef::new("sort_order", ColumnType::Integer)
        .not_null()
        .default_value(Value::Integer(0))
}

/// Version 3: profiles can be switched off without deleting them.
pub(crate) fn focus_profile_enabled() -> ColumnDef {
    ColumnDef::new("is_enabled", ColumnType::Integer)
        .not_null()
        .default_value(Value::Integer(1))
}

/// Version 4 shape of `focus_profiles`, after category renumbering.
pub(crate) fn focus_profiles_rebuilt() -> TableDef {
    TableDef::new(FOCUS_PROFILES)
        .column(ColumnDef::new("id", ColumnType::Text).not_null())
        .column(ColumnDef::new("name", ColumnType::Text).not_null())
        .column(categories_column())
        .column(focus_profile_enabled())
        .primary_key(["id"])
}

fn categories_column() -> ColumnDef {
    ColumnDef::new("categories", ColumnType::Text)
        .not_null()
        .default_value(Value::Text(EMPTY_CATEGORY_LIST.to_string()))
}
