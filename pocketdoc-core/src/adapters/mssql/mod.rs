//! SQL Server catalog adapter.
//!
//! # Module Structure
//! - `connection`: tiberius client setup, query helper, row decoding
//! - `schema_collection`: Tables, columns, constraints and indexes
//! - `views`: `sys.views`, updatability from `INSTEAD OF` triggers
//! - `routines`: Procedures and functions from `sys.objects`
//! - `sequences`: `sys.sequences`
//! - `triggers`: DML triggers from `sys.triggers`
//! - `synonyms`: `sys.synonyms`
//!
//! Comments come from the `MS_Description` extended property.
//!
//! The adapter holds a single TDS connection behind an async mutex; catalog
//! queries run one at a time.
//!
//! # Security Guarantees
//! - The connection declares `ApplicationIntent=ReadOnly` when `read_only`
//! - `sys.sql_modules.definition`, `OBJECT_DEFINITION` and `sp_helptext`
//!   are never used

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
use crate::{Result, models::*};
use async_trait::async_trait;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::Compat;

pub use synonyms::split_base_object;

/// Filter settings: `@Pn` binds, `dbo` when no schema is configured.
pub(crate) const SCOPE: DialectScope = DialectScope {
    placeholder: PlaceholderStyle::AtP,
    default_owner: "'dbo'",
};

pub(crate) type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server catalog adapter backed by one tiberius client.
pub struct SqlServerAdapter {
    client: Mutex<Option<TdsClient>>,
    config: ConnectionConfig,
    credentials: Credentials,
}

impl std::fmt::Debug for SqlServerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerAdapter")
            .field("config", &self.config)
            .field(
                "connected",
                &self.client.try_lock().map(|c| c.is_some()).unwrap_or(true),
            )
            .finish()
    }
}

impl SqlServerAdapter {
    /// Creates an unconnected adapter. Performs no I/O.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: ConnectionConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: Mutex::new(None),
            config,
            credentials,
        })
    }
}

#[async_trait]
impl SchemaExtractor for SqlServerAdapter {
    async fn connect(&mut self, ctx: &ExtractionContext) -> Result<()> {
        if self.client.get_mut().is_some() {
            return Ok(());
        }
        let client = ctx
            .run(
                "connecting to SQL Server",
                connection::open_client(&self.config, &self.credentials),
            )
            .await?;
        *self.client.get_mut() = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.get_mut().take() {
            if let Err(e) = client.close().await {
                tracing::warn!("Error while closing SQL Server connection: {}", e);
            }
            tracing::debug!("Closed SQL Server connection for {}", self.config);
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
        DatabaseType::SqlServer
    }

    fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }
}
