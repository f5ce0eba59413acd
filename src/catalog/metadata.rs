//! Reserved table that every database image carries about itself: one row,
//! keyed by the database's own id.

use crate::data_types::{DatabaseRecord, Timestamp};
use crate::engine::{EngineInstance, EngineResult, Value};

pub const METADATA_TABLE: &str = "_sqlbench_metadata";

pub fn ensure_table(instance: &dyn EngineInstance) -> EngineResult<()> {
    instance.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {METADATA_TABLE} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                created_at INTEGER NOT NULL,
                last_modified INTEGER NOT NULL
            )"
        ),
        &[],
    )?;
    Ok(())
}

pub fn read(instance: &dyn EngineInstance, id: &str) -> EngineResult<Option<DatabaseRecord>> {
    let result = instance.execute(
        &format!(
            "SELECT id, name, description, created_at, last_modified
            FROM {METADATA_TABLE} WHERE id = ?1"
        ),
        &[Value::from(id)],
    )?;

    Ok(result.rows.first().map(|row| DatabaseRecord {
        id: id.to_string(),
        name: row
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: row.get(2).and_then(Value::as_str).map(String::from),
        created_at: row.get(3).and_then(Value::as_i64).unwrap_or_default(),
        last_modified: row.get(4).and_then(Value::as_i64).unwrap_or_default(),
    }))
}

pub fn write(instance: &dyn EngineInstance, record: &DatabaseRecord) -> EngineResult<()> {
    ensure_table(instance)?;
    instance.execute(
        &format!(
            "INSERT OR REPLACE INTO {METADATA_TABLE}
            (id, name, description, created_at, last_modified)
            VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        &[
            Value::from(record.id.as_str()),
            Value::from(record.name.as_str()),
            Value::from(record.description.clone()),
            Value::from(record.created_at),
            Value::from(record.last_modified),
        ],
    )?;
    Ok(())
}

/// Re-stamp the modification time of the database's own row
pub fn touch(
    instance: &dyn EngineInstance,
    id: &str,
    last_modified: Timestamp,
) -> EngineResult<()> {
    ensure_table(instance)?;
    instance.execute(
        &format!("UPDATE {METADATA_TABLE} SET last_modified = ?1 WHERE id = ?2"),
        &[Value::from(last_modified), Value::from(id)],
    )?;
    Ok(())
}
