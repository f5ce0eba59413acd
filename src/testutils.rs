use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqliteJournalMode;

use crate::config::schema::{SqlbenchConfig, Store};
use crate::context::SessionContext;
use crate::data_types::{DatabaseBlob, DatabaseRecord, SavedQuery, Timestamp};
use crate::engine::SqliteEngine;
use crate::repository::interface::{Error, Repository, Result};
use crate::repository::sqlite::SqliteRepository;

pub async fn in_memory_repository() -> Arc<dyn Repository> {
    Arc::new(
        SqliteRepository::try_new("sqlite::memory:".to_string(), SqliteJournalMode::Wal)
            .await
            .unwrap(),
    )
}

pub fn record(id: &str, last_modified: Timestamp) -> DatabaseRecord {
    DatabaseRecord {
        id: id.to_string(),
        name: format!("database {id}"),
        description: None,
        created_at: last_modified,
        last_modified,
    }
}

pub async fn make_context(repository: Arc<dyn Repository>) -> SessionContext {
    let config = SqlbenchConfig {
        store: Store {
            dsn: "sqlite::memory:".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut context =
        SessionContext::new(config, repository, Arc::new(SqliteEngine::new()), None);
    context.init().await.unwrap();
    context
}

/// Wraps a real repository, counting blob writes and failing every write on
/// demand
#[derive(Debug)]
pub struct FailingRepository {
    inner: Arc<dyn Repository>,
    pub fail_writes: AtomicBool,
    pub blob_writes: AtomicUsize,
}

impl FailingRepository {
    pub fn new(inner: Arc<dyn Repository>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            blob_writes: AtomicUsize::new(0),
        }
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::SqlxError(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for FailingRepository {
    async fn setup(&self) -> Result<()> {
        self.inner.setup().await
    }

    async fn put_database_blob(&self, id: &str, data: &[u8]) -> Result<()> {
        self.check_write()?;
        self.blob_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put_database_blob(id, data).await
    }

    async fn get_database_blob(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get_database_blob(id).await
    }

    async fn delete_database_blob(&self, id: &str) -> Result<()> {
        self.check_write()?;
        self.inner.delete_database_blob(id).await
    }

    async fn list_all_database_blobs(&self) -> Result<Vec<DatabaseBlob>> {
        self.inner.list_all_database_blobs().await
    }

    async fn put_query(&self, query: &SavedQuery) -> Result<()> {
        self.check_write()?;
        self.inner.put_query(query).await
    }

    async fn get_all_queries(&self) -> Result<Vec<SavedQuery>> {
        self.inner.get_all_queries().await
    }

    async fn delete_query(&self, id: &str) -> Result<()> {
        self.check_write()?;
        self.inner.delete_query(id).await
    }

    async fn put_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.check_write()?;
        self.inner.put_metadata(key, value).await
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_metadata(key).await
    }

    async fn delete_metadata(&self, key: &str) -> Result<()> {
        self.check_write()?;
        self.inner.delete_metadata(key).await
    }
}
