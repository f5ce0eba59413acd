//! Plain-text rendering of results and session views for the terminal.

use chrono::{TimeZone, Utc};
use comfy_table::{presets, Cell, ContentArrangement, Table};

use crate::context::QueryResult;
use crate::data_types::{DatabaseRecord, SavedQuery, Timestamp};
use crate::schema::TableSchema;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn format_timestamp(timestamp: Timestamp) -> String {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Result grid followed by `N rows (X ms)`. Statements without a row set only
/// get the summary line.
pub fn format_result(result: &QueryResult) -> String {
    let summary = format!(
        "{} row{} ({} ms)",
        result.row_count,
        if result.row_count == 1 { "" } else { "s" },
        result.elapsed_millis
    );

    if result.columns.is_empty() {
        return summary;
    }

    let mut table = new_table();
    table.set_header(result.columns.iter().map(Cell::new));
    for row in &result.rows {
        table.add_row(row.iter().map(|v| Cell::new(v.to_string())));
    }

    format!("{table}\n{summary}")
}

pub fn format_databases(databases: &[DatabaseRecord], active: Option<&str>) -> String {
    let mut table = new_table();
    table.set_header(vec!["", "id", "name", "description", "last modified"]);
    for database in databases {
        table.add_row(vec![
            Cell::new(if Some(database.id.as_str()) == active { "*" } else { "" }),
            Cell::new(&database.id),
            Cell::new(&database.name),
            Cell::new(database.description.as_deref().unwrap_or_default()),
            Cell::new(format_timestamp(database.last_modified)),
        ]);
    }
    table.to_string()
}

pub fn format_tables(tables: &[TableSchema]) -> String {
    let mut table = new_table();
    table.set_header(vec!["table", "columns", "rows"]);
    for schema in tables {
        table.add_row(vec![
            Cell::new(&schema.name),
            Cell::new(schema.columns.len()),
            Cell::new(schema.row_count),
        ]);
    }
    table.to_string()
}

pub fn format_columns(schema: &TableSchema) -> String {
    let mut table = new_table();
    table.set_header(vec!["column", "type", "nullable", "primary key"]);
    for column in &schema.columns {
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(&column.r#type),
            Cell::new(if column.nullable { "YES" } else { "NO" }),
            Cell::new(if column.primary_key { "YES" } else { "" }),
        ]);
    }
    table.to_string()
}

pub fn format_history(history: &[SavedQuery]) -> String {
    let mut table = new_table();
    table.set_header(vec!["", "id", "query", "description", "run at"]);
    for entry in history {
        table.add_row(vec![
            Cell::new(if entry.is_favorite { "★" } else { "" }),
            Cell::new(&entry.id),
            Cell::new(&entry.query),
            Cell::new(entry.description.as_deref().unwrap_or_default()),
            Cell::new(format_timestamp(entry.timestamp)),
        ]);
    }
    table.to_string()
}

pub fn format_help(commands: &[(&str, &str)]) -> String {
    let mut table = new_table();
    table.set_header(vec!["command", "description"]);
    for (command, description) in commands {
        table.add_row(vec![*command, *description]);
    }
    table.to_string()
}
