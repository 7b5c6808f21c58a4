//! PostgreSQL catalog adapter.
//!
//! # Module Structure
//! - `connection`: Pool construction, session settings, query helper
//! - `schema_collection`: Tables, columns, constraints and indexes
//! - `views`: Views and materialized views
//! - `routines`: Functions and procedures (`pg_proc`)
//! - `sequences`: `pg_sequence`
//! - `triggers`: `pg_trigger` with `tgtype` decoding
//!
//! PostgreSQL has no synonyms; [`SchemaExtractor::synonyms`] returns an
//! empty collection.
//!
//! # Security Guarantees
//! - Sessions are read-only (`default_transaction_read_only = on`)
//! - No query reads `prosrc`, `pg_get_viewdef`, `pg_get_functiondef` or
//!   `pg_get_triggerdef`

mod connection;
mod routines;
mod schema_collection;
mod sequences;
mod triggers;
mod views;

#[cfg(test)]
mod tests;

use super::filter::{DialectScope, PlaceholderStyle};
use super::{ConnectionConfig, SchemaExtractor};
use crate::context::ExtractionContext;
use crate::security::Credentials;
use crate::{Result, error::PocketDocError, models::*};
use async_trait::async_trait;
use sqlx::PgPool;

pub use routines::decode_arguments;
pub use triggers::decode_trigger_type;

/// Filter settings: `$n` binds, `public` when no schema is configured.
pub(crate) const SCOPE: DialectScope = DialectScope {
    placeholder: PlaceholderStyle::Dollar,
    default_owner: "'public'",
};

/// PostgreSQL catalog adapter backed by a small sqlx pool.
pub struct PostgresAdapter {
    pool: Option<PgPool>,
    config: ConnectionConfig,
    credentials: Credentials,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .field("connected", &self.pool.is_some())
            .field("pool_size", &self.pool.as_ref().map(PgPool::size))
            .finish()
    }
}

impl PostgresAdapter {
    /// Creates an unconnected adapter. Performs no I/O.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: ConnectionConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: None,
            config,
            credentials,
        })
    }

    pub(crate) fn pool(&self) -> Result<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| PocketDocError::not_connected(DatabaseType::PostgreSql))
    }
}

#[async_trait]
impl SchemaExtractor for PostgresAdapter {
    async fn connect(&mut self, ctx: &ExtractionContext) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = ctx
            .run(
                "connecting to PostgreSQL",
                connection::create_pool(&self.config, &self.credentials),
            )
            .await?;
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::debug!("Closed PostgreSQL pool for {}", self.config);
        }
        Ok(())
    }

    async fn database_info(&self, ctx: &ExtractionContext) -> Result<DatabaseInfo> {
        schema_collection::database_info(self, ctx).await
    }

    async fn tables(&self, ctx: &ExtractionContext) -> Result<Vec<Table>> {
        schema_collection::collect_tables(self, ctx).await
    }

    async fn views(&self, ctx: &ExtractionContext) -> Result<Vec<View>> {
        views::collect_views(self, ctx).await
    }

    async fn routines(&self, ctx: &ExtractionContext) -> Result<Vec<Routine>> {
        routines::collect_routines(self, ctx).await
    }

    async fn sequences(&self, ctx: &ExtractionContext) -> Result<Vec<Sequence>> {
        sequences::collect_sequences(self, ctx).await
    }

    async fn triggers(&self, ctx: &ExtractionContext) -> Result<Vec<Trigger>> {
        triggers::collect_triggers(self, ctx).await
    }

    async fn synonyms(&self, _ctx: &ExtractionContext) -> Result<Vec<Synonym>> {
        self.pool()?;
        Ok(Vec::new())
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn supports(&self, kind: ObjectKind) -> bool {
        !matches!(kind, ObjectKind::Synonyms)
    }
}
