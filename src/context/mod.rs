pub mod execute;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{select_active, Catalog, CatalogError};
use crate::config::schema::SqlbenchConfig;
use crate::data_types::{DatabaseId, DatabaseRecord, SavedQuery};
use crate::engine::{Engine, EngineError, EngineInstance, Value};
use crate::generator::QueryGenerator;
use crate::history::HistoryLog;
use crate::repository::interface::{
    clear_last_opened, get_last_opened, set_last_opened, Error as RepositoryError,
    Repository,
};
use crate::schema::{load_tables, TableSchema};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Storage unavailable: {0}")]
    StoreUnavailable(RepositoryError),

    #[error("Database {id} could not be opened: {reason}")]
    BlobCorrupt { id: DatabaseId, reason: String },

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("No database selected")]
    NoActiveDatabase,

    #[error("{0}")]
    QueryFailed(String),

    #[error("Query generation failed: {0}")]
    GenerationFailed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<RepositoryError> for ContextError {
    fn from(error: RepositoryError) -> Self {
        warn!("Storage operation failed: {error}");
        ContextError::StoreUnavailable(error)
    }
}

impl From<CatalogError> for ContextError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::Repository(e) => e.into(),
            CatalogError::Engine(e) => e.into(),
        }
    }
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;

/// What the display layer gets back for a successful statement
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub elapsed_millis: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    pub statement: String,
    pub result: QueryResult,
}

struct ActiveDatabase {
    id: DatabaseId,
    instance: Box<dyn EngineInstance>,
}

/// Everything the session knows at a given point. The table and history views
/// always belong to the active database, and are empty when nothing is active.
#[derive(Default)]
struct SessionState {
    active: Option<ActiveDatabase>,
    last_opened: Option<DatabaseId>,
    databases: Vec<DatabaseRecord>,
    tables: Vec<TableSchema>,
    history: Vec<SavedQuery>,
}

/// The session controller. Owns the single live engine instance and mediates
/// every statement, switch and persistence write against it.
pub struct SessionContext {
    pub config: SqlbenchConfig,
    pub repository: Arc<dyn Repository>,
    pub catalog: Catalog,
    pub history_log: HistoryLog,
    pub generator: Option<Arc<dyn QueryGenerator>>,
    state: SessionState,
}

impl SessionContext {
    pub fn new(
        config: SqlbenchConfig,
        repository: Arc<dyn Repository>,
        engine: Arc<dyn Engine>,
        generator: Option<Arc<dyn QueryGenerator>>,
    ) -> Self {
        Self {
            config,
            catalog: Catalog::new(repository.clone(), engine),
            history_log: HistoryLog::new(repository.clone()),
            repository,
            generator,
            state: SessionState::default(),
        }
    }

    /// Pick up the remembered "last opened" database and activate whatever the
    /// selection policy settles on
    pub async fn init(&mut self) -> Result<()> {
        self.state.last_opened = get_last_opened(self.repository.as_ref()).await?;
        self.rebuild_catalog().await?;

        info!(
            "{} database(s) available, active: {}",
            self.state.databases.len(),
            self.active_id().unwrap_or("none")
        );
        Ok(())
    }

    pub fn active_id(&self) -> Option<&str> {
        self.state.active.as_ref().map(|a| a.id.as_str())
    }

    pub fn active_database(&self) -> Option<&DatabaseRecord> {
        let id = self.active_id()?;
        self.state.databases.iter().find(|d| d.id == id)
    }

    pub fn last_opened(&self) -> Option<&str> {
        self.state.last_opened.as_deref()
    }

    /// Visible catalog, most recently modified first
    pub fn databases(&self) -> &[DatabaseRecord] {
        &self.state.databases
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.state.tables
    }

    pub fn history(&self) -> &[SavedQuery] {
        &self.state.history
    }

    /// Find a catalog entry by exact id, or else by case-insensitive name
    pub fn resolve_database(&self, id_or_name: &str) -> Option<&DatabaseRecord> {
        let databases = &self.state.databases;
        databases.iter().find(|d| d.id == id_or_name).or_else(|| {
            databases
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(id_or_name))
        })
    }

    fn active_instance(&self) -> Result<&ActiveDatabase> {
        self.state.active.as_ref().ok_or(ContextError::NoActiveDatabase)
    }

    /// Re-read the catalog from storage and make sure the active database is
    /// the one the selection policy picks. Switches or clears as needed.
    pub async fn rebuild_catalog(&mut self) -> Result<()> {
        self.state.databases = self.catalog.rebuild().await?;

        let selected = select_active(
            &self.state.databases,
            self.state.last_opened.as_deref(),
            self.active_id(),
        );

        match selected {
            Some(id) if Some(id.as_str()) != self.active_id() => self.switch_to(&id).await,
            Some(_) => Ok(()),
            None => {
                self.clear_active();
                Ok(())
            }
        }
    }

    /// Make `id` the active database. Everything is loaded before the current
    /// instance is closed, so a failure leaves the session as it was.
    pub async fn switch_to(&mut self, id: &str) -> Result<()> {
        let image = self
            .repository
            .get_database_blob(id)
            .await?
            .ok_or_else(|| ContextError::NotFound {
                what: "Database",
                id: id.to_string(),
            })?;

        let instance =
            self.catalog
                .engine
                .load(&image)
                .map_err(|e| ContextError::BlobCorrupt {
                    id: id.to_string(),
                    reason: e.to_string(),
                })?;

        let tables = match load_tables(instance.as_ref()) {
            Ok(tables) => tables,
            Err(e) => {
                instance.close();
                return Err(e.into());
            }
        };

        let prepared = match self.history_log.load(id).await {
            Ok(history) => set_last_opened(self.repository.as_ref(), id)
                .await
                .map(|_| history),
            Err(e) => Err(e),
        };
        let history = match prepared {
            Ok(history) => history,
            Err(e) => {
                instance.close();
                return Err(e.into());
            }
        };

        if let Some(previous) = self.state.active.take() {
            previous.instance.close();
        }

        self.state.active = Some(ActiveDatabase {
            id: id.to_string(),
            instance,
        });
        self.state.last_opened = Some(id.to_string());
        self.state.tables = tables;
        self.state.history = history;

        info!("Switched to database {id}");
        Ok(())
    }

    /// Close the live instance (if any) and empty the dependent views
    pub fn clear_active(&mut self) {
        if let Some(previous) = self.state.active.take() {
            debug!("Closing database {}", previous.id);
            previous.instance.close();
        }
        self.state.tables.clear();
        self.state.history.clear();
    }

    pub async fn create_database(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<DatabaseRecord> {
        let record = self.catalog.provision(name, description).await?;
        self.rebuild_catalog().await?;
        self.switch_to(&record.id).await?;
        Ok(record)
    }

    /// Store a database image (as produced by `export_active`) as a new
    /// database and switch to it
    pub async fn import_database(
        &mut self,
        image: &[u8],
        name: &str,
        description: Option<String>,
    ) -> Result<DatabaseRecord> {
        let record = self
            .catalog
            .import(image, name, description)
            .await
            .map_err(|e| match e {
                CatalogError::Engine(e) => ContextError::BlobCorrupt {
                    id: name.to_string(),
                    reason: e.to_string(),
                },
                e => e.into(),
            })?;
        self.rebuild_catalog().await?;
        self.switch_to(&record.id).await?;
        Ok(record)
    }

    /// Drop a database along with its history, then let the catalog pick a
    /// new active database
    pub async fn delete_database(&mut self, id: &str) -> Result<()> {
        if self.repository.get_database_blob(id).await?.is_none() {
            return Err(ContextError::NotFound {
                what: "Database",
                id: id.to_string(),
            });
        }

        self.repository.delete_database_blob(id).await?;
        self.history_log.remove_for_database(id).await?;

        if self.state.last_opened.as_deref() == Some(id) {
            clear_last_opened(self.repository.as_ref()).await?;
            self.state.last_opened = None;
        }

        info!("Deleted database {id}");
        self.rebuild_catalog().await
    }

    pub async fn reload_history(&mut self) -> Result<()> {
        self.state.history = match self.active_id() {
            Some(id) => self.history_log.load(id).await?,
            None => vec![],
        };
        Ok(())
    }

    pub async fn append_history(
        &mut self,
        query: &str,
        description: Option<String>,
    ) -> Result<SavedQuery> {
        let id = self.active_instance()?.id.clone();
        let entry = self.history_log.append(&id, query, description).await?;
        self.reload_history().await?;
        Ok(entry)
    }

    pub async fn remove_history(&mut self, id: &str) -> Result<()> {
        self.history_log.remove(id).await?;
        self.reload_history().await
    }

    pub async fn toggle_favorite(&mut self, id: &str) -> Result<SavedQuery> {
        let entry =
            self.history_log
                .toggle_favorite(id)
                .await?
                .ok_or_else(|| ContextError::NotFound {
                    what: "Query",
                    id: id.to_string(),
                })?;
        self.reload_history().await?;
        Ok(entry)
    }

    /// Serialize the active database into the engine's native image format
    pub fn export_active(&self) -> Result<Vec<u8>> {
        Ok(self.active_instance()?.instance.export()?)
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if let Some(active) = self.state.active.take() {
            active.instance.close();
        }
    }
}
