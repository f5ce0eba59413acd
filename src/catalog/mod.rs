use std::sync::Arc;

use tracing::{debug, warn};

use crate::data_types::{new_id, now, DatabaseId, DatabaseRecord};
use crate::engine::{Engine, EngineError, EngineInstance};
use crate::repository::interface::{Error as RepositoryError, Repository};

pub mod metadata;

/// Id used by databases created before user-managed catalogs existed
pub const LEGACY_DATABASE_ID: &str = "default";
/// Bundled sample databases carry this in their name
pub const SAMPLE_NAME_MARKER: &str = "sample";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Whether the entry is left over from the sample/default database convention
/// and must stay out of the visible catalog
pub fn is_legacy_sample(record: &DatabaseRecord) -> bool {
    record.id == LEGACY_DATABASE_ID
        || record.name.to_lowercase().contains(SAMPLE_NAME_MARKER)
}

/// Decide which database should be active, given the visible catalog.
///
/// In order: the remembered "last opened" database, then the currently active
/// one, then the most recently modified one. `entries` must already be sorted
/// by `last_modified` descending. `None` means nothing can be active.
pub fn select_active(
    entries: &[DatabaseRecord],
    last_opened: Option<&str>,
    current: Option<&str>,
) -> Option<DatabaseId> {
    let exists = |id: &str| entries.iter().any(|e| e.id == id);

    last_opened
        .filter(|id| exists(*id))
        .or(current.filter(|id| exists(*id)))
        .map(String::from)
        .or_else(|| entries.first().map(|e| e.id.clone()))
}

/// Catalog of all stored databases. Metadata lives inside each database's own
/// image, so building the catalog means briefly opening every stored blob.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub repository: Arc<dyn Repository>,
    pub engine: Arc<dyn Engine>,
}

impl Catalog {
    pub fn new(repository: Arc<dyn Repository>, engine: Arc<dyn Engine>) -> Self {
        Self { repository, engine }
    }

    /// Enumerate every stored database, sorted by modification time (newest
    /// first). Blobs that fail to open or carry no metadata row are skipped.
    pub async fn rebuild(&self) -> CatalogResult<Vec<DatabaseRecord>> {
        let blobs = self.repository.list_all_database_blobs().await?;
        let total = blobs.len();

        let mut entries: Vec<DatabaseRecord> = blobs
            .into_iter()
            .filter_map(|blob| match self.read_record(&blob.id, &blob.data) {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    debug!("Database {} has no metadata row, skipping", blob.id);
                    None
                }
                Err(e) => {
                    warn!("Skipping unreadable database {}: {e}", blob.id);
                    None
                }
            })
            .filter(|record| !is_legacy_sample(record))
            .collect();

        entries.sort_by(|l, r| r.last_modified.cmp(&l.last_modified));

        debug!("Catalog rebuilt: {} of {total} stored databases visible", entries.len());
        Ok(entries)
    }

    fn read_record(
        &self,
        id: &str,
        image: &[u8],
    ) -> Result<Option<DatabaseRecord>, EngineError> {
        let instance = self.engine.load(image)?;
        let record = metadata::ensure_table(instance.as_ref())
            .and_then(|_| metadata::read(instance.as_ref(), id));
        instance.close();
        record
    }

    /// Initialize a brand-new database with its metadata row and store it.
    /// Doesn't touch the catalog listing or the active selection.
    pub async fn provision(
        &self,
        name: &str,
        description: Option<String>,
    ) -> CatalogResult<DatabaseRecord> {
        let instance = self.engine.create()?;
        self.register(instance, name, description).await
    }

    /// Store an existing database image under a fresh id, stamping it with its
    /// own metadata row. The image itself must be loadable by the engine.
    pub async fn import(
        &self,
        image: &[u8],
        name: &str,
        description: Option<String>,
    ) -> CatalogResult<DatabaseRecord> {
        let instance = self.engine.load(image)?;
        self.register(instance, name, description).await
    }

    async fn register(
        &self,
        instance: Box<dyn EngineInstance>,
        name: &str,
        description: Option<String>,
    ) -> CatalogResult<DatabaseRecord> {
        let timestamp = now();
        let record = DatabaseRecord {
            id: new_id(),
            name: name.to_string(),
            description,
            created_at: timestamp,
            last_modified: timestamp,
        };

        let image = metadata::write(instance.as_ref(), &record)
            .and_then(|_| instance.export());
        instance.close();

        self.repository.put_database_blob(&record.id, &image?).await?;
        debug!("Registered database {} ({})", record.name, record.id);

        Ok(record)
    }
}
