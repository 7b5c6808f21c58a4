//! Oracle catalog adapter.
//!
//! # Module Structure
//! - `connection`: Session setup, blocking query bridge, row decoding
//! - `schema_collection`: Tables, columns, constraints and indexes
//! - `views`: Views and materialized views
//! - `routines`: Standalone and packaged procedures and functions
//! - `sequences`: `ALL_SEQUENCES`
//! - `triggers`: `ALL_TRIGGERS` with `TRIGGER_TYPE` parsing
//! - `synonyms`: Private and public synonyms
//!
//! The `oracle` driver is synchronous. Every call runs on the blocking
//! thread pool; a cancelled query is interrupted with `break_execution` and
//! each round trip is bounded by the session call timeout.
//!
//! # Security Guarantees
//! - The session runs inside `SET TRANSACTION READ ONLY` when `read_only`
//! - `ALL_SOURCE`, `ALL_VIEWS.TEXT`, `ALL_TRIGGERS.TRIGGER_BODY` and
//!   `DBMS_METADATA` are never queried

mod connection;
mod routines;
mod schema_collection;
mod sequences;
mod synonyms;
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
use oracle::Connection;
use std::sync::Arc;

pub use connection::connect_string;
pub use triggers::parse_trigger_type;

/// Filter settings: `:n` binds, the session user's schema when no owner is
/// configured.
pub(crate) const SCOPE: DialectScope = DialectScope {
    placeholder: PlaceholderStyle::Colon,
    default_owner: "USER",
};

/// Oracle catalog adapter backed by one blocking session.
pub struct OracleAdapter {
    connection: Option<Arc<Connection>>,
    config: ConnectionConfig,
    credentials: Credentials,
}

impl std::fmt::Debug for OracleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleAdapter")
            .field("config", &self.config)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl OracleAdapter {
    /// Creates an unconnected adapter. Performs no I/O.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: ConnectionConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            connection: None,
            config,
            credentials,
        })
    }

    pub(crate) fn connection(&self) -> Result<&Arc<Connection>> {
        self.connection
            .as_ref()
            .ok_or_else(|| PocketDocError::not_connected(DatabaseType::Oracle))
    }
}

#[async_trait]
impl SchemaExtractor for OracleAdapter {
    async fn connect(&mut self, ctx: &ExtractionContext) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let connection = ctx
            .run(
                "connecting to Oracle",
                connection::open_session(&self.config, &self.credentials),
            )
            .await?;
        self.connection = Some(Arc::new(connection));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            let closed = tokio::task::spawn_blocking(move || connection.close()).await;
            match closed {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Error while closing Oracle session: {}", e),
                Err(e) => tracing::warn!("Oracle close task failed: {}", e),
            }
            tracing::debug!("Closed Oracle session for {}", self.config);
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

    async fn synonyms(&self, ctx: &ExtractionContext) -> Result<Vec<Synonym>> {
        synonyms::collect_synonyms(self, ctx).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Oracle
    }

    fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }
}
