use itertools::Itertools;
use serde::Serialize;

use crate::catalog::metadata::METADATA_TABLE;
use crate::engine::{EngineInstance, EngineResult, Value};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub name: String,
    pub r#type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Projection of a single user table in the live instance. Never stored;
/// recomputed after every mutation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub row_count: i64,
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Load every user-visible table, sorted by name. SQLite internals and the
/// reserved metadata table are left out.
pub fn load_tables(instance: &dyn EngineInstance) -> EngineResult<Vec<TableSchema>> {
    let names = instance.execute(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ?1 \
         ORDER BY name",
        &[Value::from(METADATA_TABLE)],
    )?;

    names
        .rows
        .iter()
        .filter_map(|row| row.first().and_then(Value::as_str))
        .map(|name| load_table(instance, name))
        .collect()
}

fn load_table(instance: &dyn EngineInstance, name: &str) -> EngineResult<TableSchema> {
    let quoted = quote_identifier(name);

    // cid, name, type, notnull, dflt_value, pk
    let info = instance.execute(&format!("PRAGMA table_info({quoted})"), &[])?;
    let columns = info
        .rows
        .iter()
        .map(|row| ColumnSchema {
            name: row
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            r#type: row
                .get(2)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            nullable: row.get(3).and_then(Value::as_i64) == Some(0),
            primary_key: row.get(5).and_then(Value::as_i64).unwrap_or(0) > 0,
        })
        .collect();

    let count = instance.execute(&format!("SELECT COUNT(*) FROM {quoted}"), &[])?;
    let row_count = count
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(Value::as_i64)
        .unwrap_or(0);

    Ok(TableSchema {
        name: name.to_string(),
        columns,
        row_count,
    })
}

/// Plain-text rendering of the schema, one table per line, handed to the
/// natural-language generator
pub fn describe_tables(tables: &[TableSchema]) -> String {
    tables
        .iter()
        .map(|table| {
            let columns = table
                .columns
                .iter()
                .map(|c| {
                    let mut column = format!("{} {}", c.name, c.r#type);
                    if c.primary_key {
                        column.push_str(" PRIMARY KEY");
                    }
                    if !c.nullable {
                        column.push_str(" NOT NULL");
                    }
                    column
                })
                .join(", ");
            format!("{}({columns})", table.name)
        })
        .join("\n")
}
