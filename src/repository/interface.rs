use std::fmt::Debug;

use async_trait::async_trait;

use crate::data_types::{DatabaseBlob, DatabaseId, SavedQuery};

/// Key of the single process-wide preference kept in the metadata partition
pub const LAST_OPENED_DATABASE_KEY: &str = "last_opened_database";

/// Wrapper for conversion of database-specific error codes into actual errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // All other errors
    #[error("Internal SQL error: {0}")]
    SqlxError(sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Durable key-addressed store with three independent partitions: database
/// blobs, saved queries and small metadata records. No business logic lives
/// here; callers decide what any of it means.
#[async_trait]
pub trait Repository: Send + Sync + Debug {
    async fn setup(&self) -> Result<(), Error>;

    async fn put_database_blob(&self, id: &str, data: &[u8]) -> Result<(), Error>;

    async fn get_database_blob(&self, id: &str) -> Result<Option<Vec<u8>>, Error>;

    async fn delete_database_blob(&self, id: &str) -> Result<(), Error>;

    async fn list_all_database_blobs(&self) -> Result<Vec<DatabaseBlob>, Error>;

    async fn put_query(&self, query: &SavedQuery) -> Result<(), Error>;

    async fn get_all_queries(&self) -> Result<Vec<SavedQuery>, Error>;

    async fn delete_query(&self, id: &str) -> Result<(), Error>;

    async fn put_metadata(&self, key: &str, value: &str) -> Result<(), Error>;

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, Error>;

    async fn delete_metadata(&self, key: &str) -> Result<(), Error>;
}

/// Convenience accessors for the "last opened database" preference
pub async fn get_last_opened(repository: &dyn Repository) -> Result<Option<DatabaseId>> {
    repository.get_metadata(LAST_OPENED_DATABASE_KEY).await
}

pub async fn set_last_opened(repository: &dyn Repository, id: &str) -> Result<()> {
    repository.put_metadata(LAST_OPENED_DATABASE_KEY, id).await
}

pub async fn clear_last_opened(repository: &dyn Repository) -> Result<()> {
    repository.delete_metadata(LAST_OPENED_DATABASE_KEY).await
}
