//! Narrow contract over the embedded relational engine that holds the user's
//! databases. The rest of the crate only sees opaque byte blobs going in and
//! out, plus column/row results from statement execution.

pub mod sqlite;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use sqlite::{SqliteEngine, SqliteInstance};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine rejected a statement; carries its diagnostic text verbatim
    #[error("{0}")]
    Statement(String),

    /// The bytes handed to `load` aren't a database image
    #[error("Failed to load database image: {0}")]
    InvalidImage(String),

    #[error("I/O error while moving a database image: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::Text).unwrap_or(Value::Null)
    }
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Result of running a statement. `columns` is empty for statements that
/// don't produce a row set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl StatementResult {
    pub fn has_row_set(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// A live, in-memory database
pub trait EngineInstance: Send {
    fn execute(&self, sql: &str, params: &[Value]) -> EngineResult<StatementResult>;

    /// Serialize the whole database into the engine's native image format
    fn export(&self) -> EngineResult<Vec<u8>>;

    fn close(self: Box<Self>);
}

/// Factory for engine instances
pub trait Engine: Send + Sync + fmt::Debug {
    fn create(&self) -> EngineResult<Box<dyn EngineInstance>>;

    fn load(&self, image: &[u8]) -> EngineResult<Box<dyn EngineInstance>>;
}
