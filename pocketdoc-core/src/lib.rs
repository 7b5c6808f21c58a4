//! Catalog metadata extraction for PocketDoc.
//!
//! This crate reads structural metadata (tables, views, routines, sequences,
//! triggers, synonyms, indexes and columns) from the system catalogs of
//! Oracle, MySQL, PostgreSQL and SQL Server, and normalizes it into one
//! dialect-neutral [`Schema`].
//!
//! # Security Guarantees
//! - No model type can hold view, routine or trigger source text
//! - All catalog access is read-only
//! - No credentials stored or logged in any data structures
//!
//! # Architecture
//! - [`adapters`]: one [`SchemaExtractor`] per dialect, chosen by the
//!   explicit registry
//! - [`orchestrator`]: drives a connected adapter through a full run
//! - [`context`]: cancellation and deadlines for every catalog query
//! - [`models`]: the canonical model handed to exporters

pub mod adapters;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod security;

// Re-export commonly used types
pub use adapters::{
    ConnectionConfig, ExtractorRegistry, SchemaExtractor, SslMode, create_extractor,
    supported_databases,
};
pub use context::ExtractionContext;
pub use error::{ErrorKind, PocketDocError, Result};
pub use models::{
    Column, DatabaseInfo, DatabaseType, Index, ObjectKind, Routine, RoutineArgument, Schema,
    Sequence, Synonym, Table, Trigger, View,
};
pub use orchestrator::{ExtractOptions, extract_schema, extract_schema_with};
pub use security::Credentials;
