//! Dialect adapter contract and shared catalog plumbing.
//!
//! Every supported engine implements [`SchemaExtractor`]. The dialects share
//! no behavior beyond the contract: each adapter is an independent
//! implementation selected once, at construction, through the
//! [`registry`].
//!
//! # Module Structure
//! - `config`: Connection settings (no credentials)
//! - `filter`: Schema/owner filter rendered into catalog queries
//! - `constraints`: Constraint & relationship resolution, index assembly
//! - `signature`: Routine signature synthesis
//! - `registry`: Explicit adapter factory
//! - Dialect modules (`postgres`, `mysql`, `mssql`, `oracle`), each behind
//!   its cargo feature

use crate::{
    Result,
    context::ExtractionContext,
    models::{
        DatabaseInfo, DatabaseType, ObjectKind, Routine, Schema, Sequence, Synonym, Table,
        Trigger, View,
    },
};
use async_trait::async_trait;

pub mod config;
pub mod constraints;
pub mod filter;
pub mod registry;
pub mod signature;

#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub(crate) mod helpers;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(feature = "postgresql")]
pub mod postgres;

pub use config::{ConnectionConfig, SslMode};
pub use registry::{ExtractorRegistry, create_extractor, supported_databases};

/// Catalog extraction contract implemented once per dialect.
///
/// # Security Guarantees
/// - All catalog access is read-only (SELECT only)
/// - No query selects view, routine or trigger source text
/// - Credentials are never stored in returned metadata or logged
///
/// # Object Safety
/// This trait is object-safe, allowing dynamic dispatch through
/// `Box<dyn SchemaExtractor>`.
///
/// # Errors
/// Catalog methods called before a successful [`connect`](Self::connect)
/// fail with a `Connection` error. Dialects lacking a concept (sequences,
/// synonyms) return an empty collection, never an error.
#[async_trait]
pub trait SchemaExtractor: Send + Sync {
    /// Opens the connection and verifies it with a round trip.
    async fn connect(&mut self, ctx: &ExtractionContext) -> Result<()>;

    /// Releases the connection. Idempotent; safe before `connect`.
    async fn close(&mut self) -> Result<()>;

    /// Connected database name and server version string.
    async fn database_info(&self, ctx: &ExtractionContext) -> Result<DatabaseInfo>;

    /// Tables in scope, with nested columns and indexes.
    async fn tables(&self, ctx: &ExtractionContext) -> Result<Vec<Table>>;

    /// Views in scope, with nested columns.
    async fn views(&self, ctx: &ExtractionContext) -> Result<Vec<View>>;

    /// Procedures and functions in scope, with arguments and signature.
    async fn routines(&self, ctx: &ExtractionContext) -> Result<Vec<Routine>>;

    /// Sequences in scope; empty where the dialect has none.
    async fn sequences(&self, ctx: &ExtractionContext) -> Result<Vec<Sequence>>;

    /// Triggers in scope, with timing, event and target table.
    async fn triggers(&self, ctx: &ExtractionContext) -> Result<Vec<Trigger>>;

    /// Synonyms in scope; empty where the dialect has none.
    async fn synonyms(&self, ctx: &ExtractionContext) -> Result<Vec<Synonym>>;

    /// Returns the database type this adapter handles.
    fn database_type(&self) -> DatabaseType;

    /// Gets the connection configuration (never holds credentials).
    fn connection_config(&self) -> &ConnectionConfig;

    /// True when the dialect has a native notion of `kind`.
    ///
    /// Unsupported kinds still succeed with an empty collection.
    fn supports(&self, kind: ObjectKind) -> bool {
        let _ = kind;
        true
    }

    /// Runs a full extraction; see [`crate::orchestrator::extract_schema`].
    async fn extract_schema(&self, ctx: &ExtractionContext) -> Result<Schema> {
        crate::orchestrator::extract_schema(self, ctx).await
    }
}
