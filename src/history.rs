use std::sync::Arc;

use tracing::debug;

use crate::data_types::{new_id, now, SavedQuery};
use crate::repository::interface::{Repository, Result};

/// Log of statements the user ran, scoped per database
#[derive(Debug, Clone)]
pub struct HistoryLog {
    repository: Arc<dyn Repository>,
}

impl HistoryLog {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Record a new entry. Every call creates a fresh entry, even for a
    /// statement that's already in the log.
    pub async fn append(
        &self,
        database_id: &str,
        query: &str,
        description: Option<String>,
    ) -> Result<SavedQuery> {
        let entry = SavedQuery {
            id: new_id(),
            query: query.to_string(),
            timestamp: now(),
            description,
            is_favorite: false,
            database_id: database_id.to_string(),
        };
        self.repository.put_query(&entry).await?;
        Ok(entry)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.repository.delete_query(id).await
    }

    /// Flip the favorite flag. Returns the updated entry, or `None` if there's
    /// no entry with this id.
    pub async fn toggle_favorite(&self, id: &str) -> Result<Option<SavedQuery>> {
        let Some(mut entry) = self
            .repository
            .get_all_queries()
            .await?
            .into_iter()
            .find(|q| q.id == id)
        else {
            return Ok(None);
        };

        entry.is_favorite = !entry.is_favorite;
        self.repository.put_query(&entry).await?;
        Ok(Some(entry))
    }

    /// Entries for a single database, newest first
    pub async fn load(&self, database_id: &str) -> Result<Vec<SavedQuery>> {
        let mut entries: Vec<SavedQuery> = self
            .repository
            .get_all_queries()
            .await?
            .into_iter()
            .filter(|q| q.database_id == database_id)
            .collect();

        entries.sort_by(|l, r| r.timestamp.cmp(&l.timestamp));
        Ok(entries)
    }

    /// Drop every entry belonging to a database. Returns how many went.
    pub async fn remove_for_database(&self, database_id: &str) -> Result<usize> {
        let owned = self.load(database_id).await?;
        for entry in &owned {
            self.repository.delete_query(&entry.id).await?;
        }

        debug!("Removed {} history entries of {database_id}", owned.len());
        Ok(owned.len())
    }
}
