use std::io::Write;

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{
    backup::Progress,
    params_from_iter,
    types::{ToSqlOutput, ValueRef},
    Batch, Connection, DatabaseName, ToSql,
};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{Engine, EngineError, EngineInstance, EngineResult, StatementResult, Value};

const BATCH_SAVEPOINT: &str = "sqlbench_batch";

lazy_static! {
    // Statements SQLite refuses, or that misbehave, inside an open transaction
    static ref TRANSACTION_SENSITIVE: Regex = Regex::new(concat!(
        r"(?im)(?:^|;)\s*",
        r"(?:ATTACH|DETACH|VACUUM|PRAGMA|BEGIN|COMMIT|END|ROLLBACK|SAVEPOINT|RELEASE)\b"
    ))
    .expect("valid transaction keyword pattern");
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Statement(err.to_string())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// In-process SQLite. Every instance is a private in-memory database; images
/// move in and out through the online backup API.
#[derive(Debug, Default)]
pub struct SqliteEngine {}

impl SqliteEngine {
    pub fn new() -> Self {
        Self {}
    }
}

impl Engine for SqliteEngine {
    fn create(&self) -> EngineResult<Box<dyn EngineInstance>> {
        let conn = Connection::open_in_memory()?;
        Ok(Box::new(SqliteInstance { conn }))
    }

    fn load(&self, image: &[u8]) -> EngineResult<Box<dyn EngineInstance>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(image)?;
        file.flush()?;

        let mut conn = Connection::open_in_memory()?;
        conn.restore(DatabaseName::Main, file.path(), None::<fn(Progress)>)
            .map_err(|e| EngineError::InvalidImage(e.to_string()))?;

        // The backup API copies pages without looking at them, so make sure
        // the result is actually readable
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |r| {
            r.get::<_, i64>(0)
        })
        .map_err(|e| EngineError::InvalidImage(e.to_string()))?;

        debug!("Loaded a {}-byte database image", image.len());
        Ok(Box::new(SqliteInstance { conn }))
    }
}

pub struct SqliteInstance {
    conn: Connection,
}

impl SqliteInstance {
    fn run_statement(
        stmt: &mut rusqlite::Statement<'_>,
        params: &[Value],
    ) -> EngineResult<Option<StatementResult>> {
        let bound: &[Value] = if stmt.parameter_count() > 0 { params } else { &[] };

        if stmt.column_count() == 0 {
            stmt.execute(params_from_iter(bound.iter()))?;
            return Ok(None);
        }

        let columns: Vec<String> =
            stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(bound.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(Value::from(row.get_ref(i)?));
            }
            result.push(values);
        }

        Ok(Some(StatementResult {
            columns,
            rows: result,
        }))
    }

    fn run_batch(&self, sql: &str, params: &[Value]) -> EngineResult<StatementResult> {
        let mut last_row_set = None;
        let mut batch = Batch::new(&self.conn, sql);

        while let Some(mut stmt) = batch.next()? {
            if let Some(result) = Self::run_statement(&mut stmt, params)? {
                last_row_set = Some(result);
            }
        }

        Ok(last_row_set.unwrap_or_default())
    }
}

impl EngineInstance for SqliteInstance {
    /// Runs every statement in `sql` in order. The batch is applied as a
    /// whole or not at all, unless it contains transaction control (or
    /// another statement that can't run inside a savepoint), in which case
    /// statements before a failing one stay applied.
    fn execute(&self, sql: &str, params: &[Value]) -> EngineResult<StatementResult> {
        if TRANSACTION_SENSITIVE.is_match(sql) {
            return self.run_batch(sql, params);
        }

        self.conn
            .execute_batch(&format!("SAVEPOINT {BATCH_SAVEPOINT}"))?;
        match self.run_batch(sql, params) {
            Ok(result) => {
                self.conn
                    .execute_batch(&format!("RELEASE {BATCH_SAVEPOINT}"))?;
                Ok(result)
            }
            Err(e) => {
                // SQLite may already have rolled the whole transaction back
                if let Err(rollback) = self.conn.execute_batch(&format!(
                    "ROLLBACK TO {BATCH_SAVEPOINT}; RELEASE {BATCH_SAVEPOINT}"
                )) {
                    debug!("Couldn't roll back failed batch: {rollback}");
                }
                Err(e)
            }
        }
    }

    fn export(&self) -> EngineResult<Vec<u8>> {
        let file = NamedTempFile::new()?;
        self.conn
            .backup(DatabaseName::Main, file.path(), None)
            .map_err(|e| EngineError::Statement(e.to_string()))?;

        Ok(std::fs::read(file.path())?)
    }

    fn close(self: Box<Self>) {
        if let Err((_, e)) = self.conn.close() {
            debug!("Error closing engine instance: {e}");
        }
    }
}
