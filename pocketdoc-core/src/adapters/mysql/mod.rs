//! MySQL catalog adapter.
//!
//! # Module Structure
//! - `connection`: Pool construction, session settings, query helper
//! - `schema_collection`: Tables, columns, constraints and indexes
//! - `views`: `INFORMATION_SCHEMA.VIEWS`
//! - `routines`: `ROUTINES` joined with `PARAMETERS`
//! - `triggers`: `INFORMATION_SCHEMA.TRIGGERS`
//!
//! MySQL schemas are databases, so owners are database names. MySQL has no
//! sequences or synonyms; both collections are always empty.
//!
//! Text catalog columns are selected through `CAST(... AS CHAR)` so they
//! decode as strings regardless of the server's binary collation settings.
//!
//! # Security Guarantees
//! - Sessions are read-only (`SET SESSION TRANSACTION READ ONLY`)
//! - `VIEW_DEFINITION`, `ROUTINE_DEFINITION` and `ACTION_STATEMENT` are
//!   never selected

mod connection;
mod routines;
mod schema_collection;
mod triggers;
mod views;


use super::filter::{DialectScope, PlaceholderStyle};
use super::{ConnectionConfig, SchemaExtractor};
use crate::context::ExtractionContext;
use crate::security::Credentials;
use crate::{Result, error::PocketDocError, models::*};
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Filter settings: `?` binds, the connected database when no schema is
/// configured.
pub(crate) const SCOPE: DialectScope = DialectScope {
    placeholder: PlaceholderStyle::Question,
    default_owner: "DATABASE()",
};

/// `DATE_FORMAT` pattern for catalog timestamps (session time zone is UTC).
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%i:%sZ";

/// MySQL catalog adapter backed by a small sqlx pool.
pub struct MySqlAdapter {
    pool: Option<MySqlPool>,
    config: ConnectionConfig,
    credentials: Credentials,
}

impl std::fmt::Debug for MySqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAdapter")
            .field("config", &self.config)
            .field("connected", &self.pool.is_some())
            .field("pool_size", &self.pool.as_ref().map(MySqlPool::size))
            .finish()
    }
}

impl MySqlAdapter {
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

    pub(crate) fn pool(&self) -> Result<&MySqlPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| PocketDocError::not_connected(DatabaseType::MySql))
    }
}

#[async_trait]
impl SchemaExtractor for MySqlAdapter {
    async fn connect(&mut self, ctx: &ExtractionContext) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = ctx
            .run(
                "connecting to MySQL",
                connection::create_pool(&self.config, &self.credentials),
            )
            .await?;
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::debug!("Closed MySQL pool for {}", self.config);
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

    async fn sequences(&self, _ctx: &ExtractionContext) -> Result<Vec<Sequence>> {
        self.pool()?;
        Ok(Vec::new())
    }

    async fn triggers(&self, ctx: &ExtractionContext) -> Result<Vec<Trigger>> {
        triggers::collect_triggers(self, ctx).await
    }

    async fn synonyms(&self, _ctx: &ExtractionContext) -> Result<Vec<Synonym>> {
        self.pool()?;
        Ok(Vec::new())
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn supports(&self, kind: ObjectKind) -> bool {
        !matches!(kind, ObjectKind::Sequences | ObjectKind::Synonyms)
    }
}
