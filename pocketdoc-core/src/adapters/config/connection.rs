//! Database connection configuration.
//!
//! This module provides the `ConnectionConfig` struct for configuring
//! catalog connections with security-focused defaults.

use crate::adapters::filter::SchemaFilter;
use crate::error::PocketDocError;
use crate::models::DatabaseType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// TLS negotiation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// Plaintext only.
    #[default]
    Disable,
    /// TLS when the server offers it, plaintext otherwise.
    Prefer,
    /// TLS without certificate validation.
    Require,
    /// TLS with the certificate chain validated.
    VerifyCa,
    /// TLS with the chain and host name validated.
    VerifyFull,
}

impl SslMode {
    /// True when the connection must fail rather than fall back to plaintext.
    pub fn requires_encryption(self) -> bool {
        matches!(self, SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull)
    }

    /// True when the server certificate chain must be validated.
    pub fn verifies_certificate(self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }

    /// Configuration spelling, e.g. `verify-full`.
    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = PocketDocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "disable" | "disabled" | "false" => Ok(SslMode::Disable),
            "prefer" | "preferred" => Ok(SslMode::Prefer),
            "require" | "required" | "true" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify-identity" => Ok(SslMode::VerifyFull),
            other => Err(PocketDocError::configuration(format!(
                "invalid ssl mode '{}' (expected disable, prefer, require, verify-ca, verify-full)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_connections() -> u32 {
    2
}

fn default_read_only() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

/// Configuration for catalog connections.
///
/// # Security
/// This struct intentionally does NOT store passwords or credentials.
/// Credentials are handled separately by [`crate::security::Credentials`]
/// and are never logged or serialized.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(5432)
///     .with_database("mydb".to_string())
///     .with_username("admin".to_string())
///     .with_schema_filter(["public", "billing"]);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.schema_filter.schemas(), ["public", "billing"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Port; the dialect default is used when absent
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name, or Oracle service name
    #[serde(default)]
    pub database: Option<String>,
    /// Username (password handled separately)
    #[serde(default)]
    pub username: Option<String>,
    /// TLS negotiation mode
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// Connection timeout, in seconds when serialized
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Per-statement timeout, in seconds when serialized
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub query_timeout: Duration,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Whether to enforce read-only sessions
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    /// Schemas/owners to extract; empty means the dialect default
    #[serde(default)]
    pub schema_filter: SchemaFilter,
    /// Driver-specific settings
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            database: None,
            username: None,
            ssl_mode: SslMode::default(),
            connect_timeout: default_timeout(),
            query_timeout: default_timeout(),
            max_connections: default_max_connections(),
            read_only: default_read_only(),
            schema_filter: SchemaFilter::default(),
            options: BTreeMap::new(),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}{}{})",
            self.host,
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db))
        )
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(PocketDocError::configuration("host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(PocketDocError::configuration("port must be greater than 0"));
        }

        if self.max_connections == 0 {
            return Err(PocketDocError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(PocketDocError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(PocketDocError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(PocketDocError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with safe defaults.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    /// Builder method to set username.
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the schema/owner filter.
    pub fn with_schema_filter<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema_filter = SchemaFilter::new(schemas);
        self
    }

    /// Builder method to set a driver-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Port to connect to, falling back to the dialect default.
    pub fn port_or_default(&self, database_type: DatabaseType) -> u16 {
        self.port.unwrap_or_else(|| database_type.default_port())
    }

    /// Driver option value, if set.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Driver option interpreted as a boolean (`true`, `yes`, `1`, `on`).
    pub fn option_flag(&self, key: &str) -> bool {
        self.option(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1" | "on"
            )
        })
    }

    /// `application_name` option, defaulting to `pocketdoc`.
    pub fn application_name(&self) -> &str {
        self.option("application_name").unwrap_or("pocketdoc")
    }
}
