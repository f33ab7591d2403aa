//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Key-value table schema.
#[derive(Iden)]
pub enum KeyValues {
    #[iden = "key_values"]
    Table,
    #[iden = "item_key"]
    Key,
    #[iden = "item_value"]
    Value,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the key-value table.
pub const CREATE_KEY_VALUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS key_values (
    item_key TEXT NOT NULL PRIMARY KEY,
    item_value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
