//! Adapter factory.
//!
//! Adapters are registered explicitly: [`ExtractorRegistry::builtin`] lists
//! every dialect compiled into this build, and nothing is registered as a
//! side effect of loading a module. Construction performs no I/O; the
//! connection is opened by [`SchemaExtractor::connect`].

use super::{ConnectionConfig, SchemaExtractor};
use crate::{Result, error::PocketDocError, models::DatabaseType, security::Credentials};
use std::collections::HashMap;

/// Builds an unconnected extractor.
pub type ExtractorConstructor =
    fn(ConnectionConfig, Credentials) -> Result<Box<dyn SchemaExtractor>>;

/// Map from dialect to adapter constructor.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    constructors: HashMap<DatabaseType, ExtractorConstructor>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<&str> = self.constructors.keys().map(|t| t.tag()).collect();
        registered.sort_unstable();
        f.debug_struct("ExtractorRegistry")
            .field("registered", &registered)
            .finish()
    }
}

impl ExtractorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every adapter compiled into this build.
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "oracle")]
        registry.register(DatabaseType::Oracle, |config, credentials| {
            Ok(Box::new(super::oracle::OracleAdapter::new(config, credentials)?))
        });
        #[cfg(feature = "mysql")]
        registry.register(DatabaseType::MySql, |config, credentials| {
            Ok(Box::new(super::mysql::MySqlAdapter::new(config, credentials)?))
        });
        #[cfg(feature = "postgresql")]
        registry.register(DatabaseType::PostgreSql, |config, credentials| {
            Ok(Box::new(super::postgres::PostgresAdapter::new(config, credentials)?))
        });
        #[cfg(feature = "mssql")]
        registry.register(DatabaseType::SqlServer, |config, credentials| {
            Ok(Box::new(super::mssql::SqlServerAdapter::new(config, credentials)?))
        });

        registry
    }

    /// Adds or replaces the constructor for `database_type`.
    pub fn register(&mut self, database_type: DatabaseType, constructor: ExtractorConstructor) {
        self.constructors.insert(database_type, constructor);
    }

    /// True when an adapter is registered for `database_type`.
    pub fn contains(&self, database_type: DatabaseType) -> bool {
        self.constructors.contains_key(&database_type)
    }

    /// Dialects with a registered adapter, in listing order.
    pub fn available(&self) -> Vec<DatabaseType> {
        DatabaseType::ALL
            .into_iter()
            .filter(|t| self.contains(*t))
            .collect()
    }

    /// Builds an unconnected extractor for `database_type`.
    ///
    /// # Errors
    /// Returns `UnsupportedFeature` when no adapter is registered for the
    /// dialect, or the configuration error raised by validation.
    pub fn create(
        &self,
        database_type: DatabaseType,
        config: ConnectionConfig,
        credentials: Credentials,
    ) -> Result<Box<dyn SchemaExtractor>> {
        let constructor = self.constructors.get(&database_type).ok_or_else(|| {
            PocketDocError::unsupported_feature(
                format!(
                    "catalog extraction (compile with --features {} to enable it)",
                    database_type.tag()
                ),
                database_type.tag(),
            )
        })?;
        config.validate()?;
        constructor(config, credentials)
    }
}

/// Resolves `tag` and builds the matching builtin extractor.
///
/// # Errors
/// Returns `UnsupportedDatabase` for unknown tags and `UnsupportedFeature`
/// for known dialects not compiled into this build.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::{ConnectionConfig, create_extractor};
/// use pocketdoc_core::security::Credentials;
///
/// let err = create_extractor("db2", ConnectionConfig::default(), Credentials::default())
///     .err()
///     .unwrap();
/// assert_eq!(
///     err.to_string(),
///     "unsupported database type: db2 (supported: oracle, mysql, postgresql, mssql)"
/// );
/// ```
pub fn create_extractor(
    tag: &str,
    config: ConnectionConfig,
    credentials: Credentials,
) -> Result<Box<dyn SchemaExtractor>> {
    let database_type = DatabaseType::from_tag(tag)?;
    ExtractorRegistry::builtin().create(database_type, config, credentials)
}

/// Canonical tags of every supported dialect.
pub fn supported_databases() -> Vec<&'static str> {
    DatabaseType::ALL.iter().map(|t| t.tag()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExtractionContext;
    use crate::error::ErrorKind;
    use crate::models::*;
    use async_trait::async_trait;

    struct StubExtractor {
        config: ConnectionConfig,
    }

    #[async_trait]
    impl SchemaExtractor for StubExtractor {
        async fn connect(&mut self, _ctx: &ExtractionContext) -> Result<()> {
            Ok(())
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
        async fn database_info(&self, _ctx: &ExtractionContext) -> Result<DatabaseInfo> {
            Ok(DatabaseInfo {
                name: "stub".to_string(),
                version: "1".to_string(),
            })
        }
        async fn tables(&self, _ctx: &ExtractionContext) -> Result<Vec<Table>> {
            Ok(Vec::new())
        }
        async fn views(&self, _ctx: &ExtractionContext) -> Result<Vec<View>> {
            Ok(Vec::new())
        }
        async fn routines(&self, _ctx: &ExtractionContext) -> Result<Vec<Routine>> {
            Ok(Vec::new())
        }
        async fn sequences(&self, _ctx: &ExtractionContext) -> Result<Vec<Sequence>> {
            Ok(Vec::new())
        }
        async fn triggers(&self, _ctx: &ExtractionContext) -> Result<Vec<Trigger>> {
            Ok(Vec::new())
        }
        async fn synonyms(&self, _ctx: &ExtractionContext) -> Result<Vec<Synonym>> {
            Ok(Vec::new())
        }
        fn database_type(&self) -> DatabaseType {
            DatabaseType::Oracle
        }
        fn connection_config(&self) -> &ConnectionConfig {
            &self.config
        }
    }

    fn stub(config: ConnectionConfig, _credentials: Credentials) -> Result<Box<dyn SchemaExtractor>> {
        Ok(Box::new(StubExtractor { config }))
    }

    #[test]
    fn test_supported_databases() {
        assert_eq!(supported_databases(), ["oracle", "mysql", "postgresql", "mssql"]);
    }

    #[test]
    fn test_unknown_tag_lists_supported_set() {
        let err = create_extractor("sybase", ConnectionConfig::default(), Credentials::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("supported: oracle, mysql, postgresql, mssql"));
    }

    #[test]
    fn test_empty_registry_reports_unsupported_feature() {
        let err = ExtractorRegistry::new()
            .create(
                DatabaseType::Oracle,
                ConnectionConfig::default(),
                Credentials::default(),
            )
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_register_overrides_constructor() {
        let mut registry = ExtractorRegistry::new();
        registry.register(DatabaseType::Oracle, stub);
        assert!(registry.contains(DatabaseType::Oracle));
        assert_eq!(registry.available(), [DatabaseType::Oracle]);

        let extractor = registry
            .create(
                DatabaseType::Oracle,
                ConnectionConfig::new("db".to_string()),
                Credentials::default(),
            )
            .unwrap();
        assert_eq!(extractor.database_type(), DatabaseType::Oracle);
        assert_eq!(extractor.connection_config().host, "db");
    }

    #[test]
    fn test_create_validates_config() {
        let mut registry = ExtractorRegistry::new();
        registry.register(DatabaseType::Oracle, stub);
        let err = registry
            .create(
                DatabaseType::Oracle,
                ConnectionConfig::new(String::new()),
                Credentials::default(),
            )
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_builtin_aliases_resolve_to_postgres() {
        for alias in ["postgresql", "postgres", "pg", " PG "] {
            let extractor =
                create_extractor(alias, ConnectionConfig::default(), Credentials::default())
                    .unwrap();
            assert_eq!(extractor.database_type(), DatabaseType::PostgreSql);
        }
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_builtin_mysql() {
        let extractor =
            create_extractor("MySQL", ConnectionConfig::default(), Credentials::default()).unwrap();
        assert_eq!(extractor.database_type(), DatabaseType::MySql);
    }
}
