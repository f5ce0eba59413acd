use std::{fmt::Debug, str::FromStr};

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tracing::debug;

use crate::data_types::{now, DatabaseBlob, SavedQuery};

use super::interface::{Error, Repository, Result};

#[derive(Debug)]
pub struct SqliteRepository {
    pub executor: Pool<Sqlite>,
}

impl SqliteRepository {
    pub const MIGRATOR: Migrator = sqlx::migrate!("migrations/sqlite");

    pub async fn try_new(dsn: String, journal_mode: SqliteJournalMode) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&dsn)
            .map_err(Self::interpret_error)?
            .create_if_missing(true)
            .journal_mode(journal_mode);

        // Every connection to a private in-memory database sees its own copy,
        // so keep exactly one alive for the lifetime of the pool
        let pool_options = if dsn.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(Self::interpret_error)?;
        let repo = Self { executor: pool };
        repo.setup().await?;
        Ok(repo)
    }

    pub fn interpret_error(error: sqlx::Error) -> Error {
        if let sqlx::Error::Database(ref d) = error {
            // Reference: https://www.sqlite.org/rescode.html#full
            let message = d.message();

            if message.contains("database or disk is full") {
                return Error::QuotaExceeded(error);
            }
        }
        Error::SqlxError(error)
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn setup(&self) -> Result<(), Error> {
        SqliteRepository::MIGRATOR.run(&self.executor).await?;
        Ok(())
    }

    async fn put_database_blob(&self, id: &str, data: &[u8]) -> Result<(), Error> {
        sqlx::query(
            r#"INSERT INTO database_blob (id, data, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
        )
        .bind(id)
        .bind(data)
        .bind(now())
        .execute(&self.executor)
        .await
        .map_err(Self::interpret_error)?;

        debug!("Stored {} bytes for database {id}", data.len());
        Ok(())
    }

    async fn get_database_blob(&self, id: &str) -> Result<Option<Vec<u8>>, Error> {
        let row = sqlx::query("SELECT data FROM database_blob WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        row.map(|r| r.try_get("data"))
            .transpose()
            .map_err(Self::interpret_error)
    }

    async fn delete_database_blob(&self, id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM database_blob WHERE id = $1")
            .bind(id)
            .execute(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        Ok(())
    }

    async fn list_all_database_blobs(&self) -> Result<Vec<DatabaseBlob>, Error> {
        let blobs = sqlx::query_as("SELECT id, data FROM database_blob ORDER BY id")
            .fetch(&self.executor)
            .try_collect()
            .await
            .map_err(Self::interpret_error)?;

        Ok(blobs)
    }

    async fn put_query(&self, query: &SavedQuery) -> Result<(), Error> {
        sqlx::query(
            r#"INSERT INTO saved_query (id, database_id, query, timestamp, description, is_favorite)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                database_id = excluded.database_id,
                query = excluded.query,
                timestamp = excluded.timestamp,
                description = excluded.description,
                is_favorite = excluded.is_favorite"#,
        )
        .bind(&query.id)
        .bind(&query.database_id)
        .bind(&query.query)
        .bind(query.timestamp)
        .bind(&query.description)
        .bind(query.is_favorite)
        .execute(&self.executor)
        .await
        .map_err(Self::interpret_error)?;

        Ok(())
    }

    async fn get_all_queries(&self) -> Result<Vec<SavedQuery>, Error> {
        let queries = sqlx::query_as(
            r#"SELECT id, query, timestamp, description, is_favorite, database_id
            FROM saved_query"#,
        )
        .fetch(&self.executor)
        .try_collect()
        .await
        .map_err(Self::interpret_error)?;

        Ok(queries)
    }

    async fn delete_query(&self, id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM saved_query WHERE id = $1")
            .bind(id)
            .execute(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        Ok(())
    }

    async fn put_metadata(&self, key: &str, value: &str) -> Result<(), Error> {
        sqlx::query(
            r#"INSERT INTO metadata (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.executor)
        .await
        .map_err(Self::interpret_error)?;

        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, Error> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        row.map(|r| r.try_get("value"))
            .transpose()
            .map_err(Self::interpret_error)
    }

    async fn delete_metadata(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM metadata WHERE key = $1")
            .bind(key)
            .execute(&self.executor)
            .await
            .map_err(Self::interpret_error)?;

        Ok(())
    }
}
