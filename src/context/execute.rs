use std::time::Instant;

use tracing::{debug, info};

use super::{ContextError, GeneratedQuery, QueryResult, Result, SessionContext};
use crate::catalog::metadata;
use crate::data_types::now;
use crate::engine::Value;
use crate::schema::{describe_tables, load_tables};
use crate::statement::{
    leading_keyword, parse_attach, plan_refresh, RefreshStep, StatementOutcome,
};

impl SessionContext {
    pub async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.execute_with_params(sql, &[]).await
    }

    /// Run a statement against the active database, then walk through the
    /// refresh steps its outcome calls for
    pub async fn execute_with_params(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<QueryResult> {
        self.active_instance()?;

        let provisioned_database = match parse_attach(sql) {
            Some(target) => {
                let description = Some(format!("Attached from {}", target.path));
                let record = self.catalog.provision(&target.alias, description).await?;
                info!("Registered {} for attached {}", record.id, target.path);
                true
            }
            None => false,
        };

        let start = Instant::now();
        let result = self.active_instance()?.instance.execute(sql, params);
        let elapsed_millis = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                // The new entry exists regardless of how the attach went
                if provisioned_database {
                    self.rebuild_catalog().await?;
                }
                // Statements ahead of the failing one may have stuck if the
                // batch couldn't be rolled back
                if self.state.active.is_some() {
                    self.reload_schema()?;
                }
                return Err(ContextError::QueryFailed(e.to_string()));
            }
        };

        let outcome = StatementOutcome {
            keyword: leading_keyword(sql),
            has_row_set: result.has_row_set(),
            provisioned_database,
        };
        // A failed step doesn't stop the rest: the views still have to match
        // the live instance when the store is down. The first error wins.
        let mut failure = None;
        for step in plan_refresh(&outcome, self.config.misc.persist_read_only) {
            if let Err(e) = self.run_refresh_step(step).await {
                failure.get_or_insert(e);
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        debug!("Statement done in {elapsed_millis} ms: {sql}");
        Ok(QueryResult {
            row_count: result.rows.len(),
            columns: result.columns,
            rows: result.rows,
            elapsed_millis,
        })
    }

    pub async fn run_refresh_step(&mut self, step: RefreshStep) -> Result<()> {
        match step {
            RefreshStep::Persist => self.persist_now().await,
            RefreshStep::ReloadSchema => self.reload_schema(),
            RefreshStep::RebuildCatalog => self.rebuild_catalog().await,
        }
    }

    /// Recompute the table view from the live instance
    pub fn reload_schema(&mut self) -> Result<()> {
        let tables = load_tables(self.active_instance()?.instance.as_ref())?;
        self.state.tables = tables;
        Ok(())
    }

    /// Write the active database to storage. The image is saved twice: once
    /// as-is, then again after its own metadata row has been re-stamped with
    /// the modification time.
    pub async fn persist_now(&mut self) -> Result<()> {
        let active = self.active_instance()?;
        let id = active.id.clone();
        let instance = active.instance.as_ref();

        let image = instance.export()?;
        self.repository.put_database_blob(&id, &image).await?;

        let last_modified = now();
        metadata::touch(instance, &id, last_modified)?;
        if metadata::read(instance, &id)?.is_none() {
            // The metadata row was deleted by a statement, put back what the
            // catalog knows
            if let Some(record) = self.state.databases.iter().find(|d| d.id == id) {
                let mut record = record.clone();
                record.last_modified = last_modified;
                metadata::write(instance, &record)?;
            }
        }

        let image = instance.export()?;
        self.repository.put_database_blob(&id, &image).await?;

        if let Some(record) = self.state.databases.iter_mut().find(|d| d.id == id) {
            record.last_modified = last_modified;
        }
        self.state
            .databases
            .sort_by(|l, r| r.last_modified.cmp(&l.last_modified));

        debug!("Persisted database {id} ({} bytes)", image.len());
        Ok(())
    }

    /// Turn a natural-language prompt into a statement and run it like any
    /// other statement
    pub async fn generate_and_execute(&mut self, prompt: &str) -> Result<GeneratedQuery> {
        self.active_instance()?;

        let generator = self.generator.clone().ok_or_else(|| {
            ContextError::GenerationFailed("No generator is configured".to_string())
        })?;

        let schema = describe_tables(self.tables());
        let statement = generator
            .generate(prompt, &schema)
            .await
            .map_err(|e| ContextError::GenerationFailed(e.to_string()))?;

        info!("Generated statement: {statement}");
        let result = self.execute(&statement).await?;
        Ok(GeneratedQuery { statement, result })
    }
}
