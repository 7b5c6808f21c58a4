//! SQL Server connection setup and row decoding.
//!
//! tiberius has no pool and no statement timeout, so each query is bounded
//! by `query_timeout` here and by the extraction context around it.

use super::{SqlServerAdapter, TdsClient};
use crate::adapters::config::ConnectionConfig;
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::DatabaseType;
use crate::security::Credentials;
use crate::Result;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

/// Builds the tiberius configuration from the connection settings.
///
/// Encryption is `Required` for `require`, `verify-ca` and `verify-full`;
/// `require` alone accepts any server certificate.
pub(crate) fn tiberius_config(config: &ConnectionConfig, credentials: &Credentials) -> Config {
    let mut tds = Config::new();
    tds.host(&config.host);
    tds.port(config.port_or_default(DatabaseType::SqlServer));
    tds.application_name(config.application_name());
    tds.readonly(config.read_only);

    let username = if credentials.username().is_empty() {
        config.username.as_deref().unwrap_or("sa")
    } else {
        credentials.username()
    };
    tds.authentication(AuthMethod::sql_server(
        username,
        credentials.password().unwrap_or_default(),
    ));

    if let Some(database) = &config.database {
        tds.database(database);
    }

    if config.ssl_mode.requires_encryption() {
        tds.encryption(EncryptionLevel::Required);
        if !config.ssl_mode.verifies_certificate() {
            tds.trust_cert();
        }
    } else {
        tds.encryption(EncryptionLevel::NotSupported);
    }
    tds
}

/// Opens and verifies a client connection.
///
/// # Errors
/// Returns a `Connection` error when the TCP connect times out or fails,
/// or when the TDS login is rejected.
pub(crate) async fn open_client(
    config: &ConnectionConfig,
    credentials: &Credentials,
) -> Result<TdsClient> {
    let tds = tiberius_config(config, credentials);

    let tcp = tokio::time::timeout(config.connect_timeout, TcpStream::connect(tds.get_addr()))
        .await
        .map_err(|elapsed| {
            PocketDocError::connection_failed(
                format!("Timed out connecting to SQL Server at {}", config),
                elapsed,
            )
        })?
        .map_err(|e| {
            PocketDocError::connection_failed(
                format!("Failed to reach SQL Server at {}", config),
                e,
            )
        })?;
    tcp.set_nodelay(true).map_err(|e| {
        PocketDocError::connection_failed(format!("Failed to configure socket for {}", config), e)
    })?;

    let mut client = Client::connect(tds, tcp.compat_write())
        .await
        .map_err(|e| {
            PocketDocError::connection_failed(
                format!("Failed to log in to SQL Server at {}", config),
                e,
            )
        })?;

    let ping = async { client.simple_query("SELECT 1").await?.into_row().await };
    if let Err(e) = ping.await {
        return Err(PocketDocError::connection_failed(
            format!("SQL Server connectivity check failed for {}", config),
            e,
        ));
    }

    tracing::info!("Connected to SQL Server at {}", config);
    Ok(client)
}

impl SqlServerAdapter {
    /// Runs one catalog query and returns its first result set.
    ///
    /// `binds` fill `@P1..@Pn` in order. A query abandoned by cancellation
    /// leaves the TDS stream mid-response, so the client is dropped and
    /// later calls fail as not connected.
    pub(crate) async fn fetch_rows(
        &self,
        ctx: &ExtractionContext,
        purpose: &str,
        sql: &str,
        binds: &[String],
    ) -> Result<Vec<Row>> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| PocketDocError::not_connected(DatabaseType::SqlServer))?;
        let timeout = self.config.query_timeout;

        let result = ctx
            .run(purpose, async {
                let mut query = Query::new(sql);
                for value in binds {
                    query.bind(value.as_str());
                }
                let rows = tokio::time::timeout(timeout, async {
                    query.query(client).await?.into_first_result().await
                })
                .await
                .map_err(|_| PocketDocError::deadline_exceeded(purpose, timeout))?
                .map_err(|e| PocketDocError::query_failed(purpose, e))?;
                Ok(rows)
            })
            .await;

        if matches!(&result, Err(e) if e.is_cancellation()) {
            tracing::debug!("Dropping SQL Server connection after abandoned query: {}", purpose);
            *guard = None;
        }
        result
    }
}

/// Typed access to tiberius rows with mapping errors that name the field.
///
/// Catalog queries cast integers to `BIGINT` and text to `NVARCHAR` so each
/// field decodes as exactly one Rust type.
pub(crate) trait TdsRowExt {
    /// Nullable text field.
    fn text(&self, field: &str, purpose: &str) -> Result<Option<String>>;

    /// Nullable `BIGINT` field.
    fn int(&self, field: &str, purpose: &str) -> Result<Option<i64>>;

    /// Nullable `BIT` field.
    fn flag(&self, field: &str, purpose: &str) -> Result<Option<bool>>;

    /// Text field the model requires.
    fn required_text(&self, field: &str, purpose: &str) -> Result<String> {
        self.text(field, purpose)?
            .ok_or_else(|| PocketDocError::unexpected_null(field, purpose))
    }

    /// `BIGINT` field the model requires.
    fn required_int(&self, field: &str, purpose: &str) -> Result<i64> {
        self.int(field, purpose)?
            .ok_or_else(|| PocketDocError::unexpected_null(field, purpose))
    }
}

impl TdsRowExt for Row {
    fn text(&self, field: &str, purpose: &str) -> Result<Option<String>> {
        self.try_get::<&str, _>(field)
            .map(|value| value.map(str::to_string))
            .map_err(|e| PocketDocError::mapping(field, purpose, e))
    }

    fn int(&self, field: &str, purpose: &str) -> Result<Option<i64>> {
        self.try_get::<i64, _>(field)
            .map_err(|e| PocketDocError::mapping(field, purpose, e))
    }

    fn flag(&self, field: &str, purpose: &str) -> Result<Option<bool>> {
        self.try_get::<bool, _>(field)
            .map_err(|e| PocketDocError::mapping(field, purpose, e))
    }
}

/// `LEFT JOIN` fragment for the `MS_Description` property of an object.
///
/// `class` is 1 for objects and columns, 7 for indexes; `minor` is the
/// column or index id expression, or `0` for the object itself.
pub(crate) fn description_join(alias: &str, major: &str, minor: &str, class: u8) -> String {
    format!(
        "LEFT JOIN sys.extended_properties {alias} ON {alias}.class = {class} \
         AND {alias}.major_id = {major} AND {alias}.minor_id = {minor} \
         AND {alias}.name = 'MS_Description'"
    )
}

/// ISO-8601 rendering of a `datetime` catalog column.
pub(crate) fn iso_timestamp(column: &str) -> String {
    format!("CONVERT(NVARCHAR(33), {column}, 126)")
}
