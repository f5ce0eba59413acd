use std::sync::Arc;

use tracing::info;

use crate::context::{ContextError, SessionContext};
use crate::engine::SqliteEngine;
use crate::generator::{HttpQueryGenerator, QueryGenerator};
use crate::repository::{interface::Repository, sqlite::SqliteRepository};

use super::schema::SqlbenchConfig;

async fn build_repository(
    config: &SqlbenchConfig,
) -> Result<Arc<dyn Repository>, ContextError> {
    let repository = SqliteRepository::try_new(
        config.store.dsn.clone(),
        config.store.journal_mode.into(),
    )
    .await?;

    info!("Opened the store at {}", config.store.dsn);
    Ok(Arc::new(repository))
}

fn build_generator(
    config: &SqlbenchConfig,
) -> Result<Option<Arc<dyn QueryGenerator>>, ContextError> {
    let Some(generator) = &config.generator else {
        return Ok(None);
    };

    let generator = HttpQueryGenerator::try_new(generator.clone())
        .map_err(|e| ContextError::GenerationFailed(e.to_string()))?;
    Ok(Some(Arc::new(generator)))
}

/// Open the durable store, wire up the engine and the optional generator, and
/// activate whichever database the catalog selects
pub async fn build_context(config: SqlbenchConfig) -> Result<SessionContext, ContextError> {
    let repository = build_repository(&config).await?;
    let generator = build_generator(&config)?;

    let mut context =
        SessionContext::new(config, repository, Arc::new(SqliteEngine::new()), generator);
    context.init().await?;
    Ok(context)
}
