//! YAML configuration for the collector.
//!
//! ```yaml
//! database:
//!   type: oracle
//!   host: db.example.com
//!   port: 1521
//!   database: ORCLPDB1
//!   username: hr
//!   ssl_mode: require
//!   timeout: 60
//!   schema_filter: [HR, FINANCE]
//! extract:
//!   include_synonyms: false
//! logging:
//!   level: debug
//!   format: json
//! ```
//!
//! # Security
//! - The password may come from the file, but `POCKETDOC_PASSWORD` wins
//! - `Debug` output never includes the password

use pocketdoc_core::{
    ConnectionConfig, Credentials, ExtractOptions, PocketDocError, Result, SslMode,
    logging::LogFormat, models::DatabaseType, security::parse_connection_string,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configured password.
pub const PASSWORD_ENV: &str = "POCKETDOC_PASSWORD";

/// Complete collector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseSection,
    #[serde(default)]
    pub extract: ExtractOptions,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Output file; stdout when absent.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Connection target.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    #[serde(rename = "type")]
    pub database_type: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// Per-query timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub schema_filter: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl std::fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("database_type", &self.database_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("ssl_mode", &self.ssl_mode)
            .field("timeout", &self.timeout)
            .field("schema_filter", &self.schema_filter)
            .finish_non_exhaustive()
    }
}

/// Log verbosity named in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The equivalent `(verbose, quiet)` flag pair.
    pub fn as_flags(self) -> (u8, bool) {
        match self {
            LogLevel::Error => (0, true),
            LogLevel::Info => (0, false),
            LogLevel::Debug => (1, false),
            LogLevel::Trace => (2, false),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

/// Everything needed to build and drive one extractor.
#[derive(Debug)]
pub struct Target {
    pub database_type: DatabaseType,
    pub config: ConnectionConfig,
    pub credentials: Credentials,
}

fn env_password() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}

impl Target {
    /// Resolves a database URL, applying `POCKETDOC_PASSWORD`.
    ///
    /// # Errors
    /// Returns the URL parse or validation error.
    pub fn from_url(url: &str) -> Result<Self> {
        let (database_type, config, mut credentials) = parse_connection_string(url)?;
        if let Some(password) = env_password() {
            credentials.set_password(Some(password));
        }
        Ok(Self {
            database_type,
            config,
            credentials,
        })
    }

    /// Replaces the schema filter when `schemas` is non-empty.
    #[must_use]
    pub fn with_schemas(mut self, schemas: &[String]) -> Self {
        if !schemas.is_empty() {
            self.config = self.config.with_schema_filter(schemas.iter().cloned());
        }
        self
    }
}

impl AppConfig {
    /// Parses a YAML document.
    ///
    /// # Errors
    /// Returns a configuration error for malformed YAML or unknown keys.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            let location = e
                .location()
                .map_or_else(String::new, |l| format!(" at line {}", l.line()));
            PocketDocError::configuration(format!("invalid configuration{}: {}", location, e))
        })
    }

    /// Reads and parses a YAML file.
    ///
    /// # Errors
    /// Returns a configuration error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PocketDocError::configuration(format!(
                "failed to read configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Resolves the configured target, applying `POCKETDOC_PASSWORD`.
    ///
    /// # Errors
    /// Returns `UnsupportedDatabase` for an unknown type tag and a
    /// configuration error when the settings fail validation.
    pub fn target(&self) -> Result<Target> {
        let section = &self.database;
        let database_type = DatabaseType::from_tag(&section.database_type)?;

        let mut config = ConnectionConfig::new(section.host.clone())
            .with_ssl_mode(section.ssl_mode)
            .with_schema_filter(section.schema_filter.iter().cloned());
        config.port = section.port;
        config.database = section.database.clone();
        config.username = section.username.clone();
        config.options = section.options.clone();
        if let Some(seconds) = section.timeout {
            config = config.with_query_timeout(Duration::from_secs(seconds));
        }
        config.validate()?;

        let password = env_password().or_else(|| section.password.clone());
        let credentials =
            Credentials::new(section.username.clone().unwrap_or_default(), password);

        Ok(Target {
            database_type,
            config,
            credentials,
        })
    }
}
