use serde::{Deserialize, Serialize};

pub type DatabaseId = String;
pub type QueryId = String;
/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Time-ordered, collision-free identifier for databases and saved queries
pub fn new_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Catalog entry for a single stored database. Built from the reserved
/// metadata table inside the database's own blob.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRecord {
    pub id: DatabaseId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuery {
    pub id: QueryId,
    pub query: String,
    pub timestamp: Timestamp,
    pub description: Option<String>,
    pub is_favorite: bool,
    pub database_id: DatabaseId,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseBlob {
    pub id: DatabaseId,
    pub data: Vec<u8>,
}
