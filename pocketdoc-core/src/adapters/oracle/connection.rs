//! Oracle session setup and the bridge from the blocking driver to async.
//!
//! Rows are decoded on the blocking thread into [`CatalogRow`], an owned
//! map of upper-case column names to text. Numbers arrive as their decimal
//! text and are parsed on access.

use super::OracleAdapter;
use crate::adapters::config::ConnectionConfig;
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::DatabaseType;
use crate::security::Credentials;
use crate::Result;
use oracle::sql_type::ToSql;
use oracle::Connection;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds an Easy Connect string for the configured server.
///
/// `require` and stronger SSL modes switch to `tcps`; `verify-full` also
/// asks the client to match the server certificate DN. Without a database
/// the listener's default service is used.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::ConnectionConfig;
/// use pocketdoc_core::adapters::oracle::connect_string;
///
/// let config = ConnectionConfig::new("ora.internal".to_string())
///     .with_database("FREEPDB1".to_string());
/// assert_eq!(connect_string(&config), "//ora.internal:1521/FREEPDB1");
/// ```
pub fn connect_string(config: &ConnectionConfig) -> String {
    let scheme = if config.ssl_mode.requires_encryption() {
        "tcps:"
    } else {
        ""
    };
    let mut target = format!(
        "{}//{}:{}",
        scheme,
        config.host,
        config.port_or_default(DatabaseType::Oracle)
    );
    if let Some(service) = config.database.as_deref().filter(|s| !s.is_empty()) {
        target.push('/');
        target.push_str(service);
    }
    if config.ssl_mode == crate::adapters::SslMode::VerifyFull {
        target.push_str("?ssl_server_dn_match=true");
    }
    target
}

/// Opens a session on the blocking pool and prepares it for catalog reads.
///
/// # Errors
/// Returns a `Connection` error when the connect attempt times out, the
/// login is rejected, or session setup fails.
pub(crate) async fn open_session(
    config: &ConnectionConfig,
    credentials: &Credentials,
) -> Result<Connection> {
    let target = connect_string(config);
    let username = if credentials.username().is_empty() {
        config.username.clone().unwrap_or_else(|| "system".to_string())
    } else {
        credentials.username().to_string()
    };
    let credentials = credentials.clone();
    let settings = config.clone();
    let display = config.to_string();

    let task = tokio::task::spawn_blocking(move || {
        let connection = Connection::connect(
            &username,
            credentials.password().unwrap_or_default(),
            &target,
        )
        .map_err(|e| {
            PocketDocError::connection_failed(
                format!("Failed to log in to Oracle at {}", settings),
                e,
            )
        })?;
        prepare_session(&connection, &settings).map_err(|e| {
            PocketDocError::connection_failed(
                format!("Failed to configure Oracle session for {}", settings),
                e,
            )
        })?;
        Ok(connection)
    });

    let connection = tokio::time::timeout(config.connect_timeout, task)
        .await
        .map_err(|elapsed| {
            PocketDocError::connection_failed(
                format!("Timed out connecting to Oracle at {}", display),
                elapsed,
            )
        })?
        .map_err(|e| {
            PocketDocError::connection_failed(
                format!("Oracle connect task failed for {}", display),
                e,
            )
        })??;

    tracing::info!("Connected to Oracle at {}", display);
    Ok(connection)
}

/// Session settings: module name, per-call timeout, read-only transaction
/// and a round trip to verify the login.
fn prepare_session(connection: &Connection, config: &ConnectionConfig) -> oracle::Result<()> {
    connection.set_module(config.application_name())?;
    connection.set_call_timeout(Some(config.query_timeout))?;
    if config.read_only {
        connection.execute("SET TRANSACTION READ ONLY", &[])?;
    }
    connection.query_row_as::<String>("SELECT 'ok' FROM DUAL", &[])?;
    Ok(())
}

impl OracleAdapter {
    /// Runs one catalog query on the blocking pool and returns every row.
    ///
    /// `binds` fill `:1..:n` in order. When the context wins the race the
    /// server call is interrupted so the session is free for `close`.
    pub(crate) async fn fetch_rows(
        &self,
        ctx: &ExtractionContext,
        purpose: &str,
        sql: &str,
        binds: &[String],
    ) -> Result<Vec<CatalogRow>> {
        let connection = Arc::clone(self.connection()?);
        let worker = Arc::clone(&connection);
        let sql = sql.to_string();
        let binds = binds.to_vec();
        let label = purpose.to_string();

        let result = ctx
            .run(purpose, async move {
                tokio::task::spawn_blocking(move || query_all(&worker, &label, &sql, &binds))
                    .await
                    .map_err(|e| PocketDocError::query_failed(purpose, e))?
            })
            .await;

        if matches!(&result, Err(e) if e.is_cancellation()) {
            tracing::debug!("Interrupting Oracle call after abandoned query: {}", purpose);
            let interrupted = tokio::task::spawn_blocking(move || connection.break_execution()).await;
            match interrupted {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Failed to interrupt Oracle call: {}", e),
                Err(e) => tracing::warn!("Oracle interrupt task failed: {}", e),
            }
        }
        result
    }
}

fn query_all(
    connection: &Connection,
    purpose: &str,
    sql: &str,
    binds: &[String],
) -> Result<Vec<CatalogRow>> {
    let params: Vec<&dyn ToSql> = binds.iter().map(|value| value as &dyn ToSql).collect();
    let result_set = connection
        .query(sql, &params)
        .map_err(|e| PocketDocError::query_failed(purpose, e))?;
    let names: Vec<String> = result_set
        .column_info()
        .iter()
        .map(|info| info.name().to_ascii_uppercase())
        .collect();

    let mut rows = Vec::new();
    for row in result_set {
        let row = row.map_err(|e| PocketDocError::query_failed(purpose, e))?;
        let mut fields = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let value: Option<String> = row
                .get(idx)
                .map_err(|e| PocketDocError::mapping(name, purpose, e))?;
            fields.insert(name.clone(), value);
        }
        rows.push(CatalogRow { fields });
    }
    Ok(rows)
}

/// One dictionary row, decoded to text on the blocking thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CatalogRow {
    fields: HashMap<String, Option<String>>,
}

impl CatalogRow {
    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, Option<&str>)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
                .collect(),
        }
    }

    /// Nullable text field. Selecting a field the query does not return is
    /// a mapping error.
    pub(crate) fn text(&self, field: &str, purpose: &str) -> Result<Option<String>> {
        self.fields
            .get(field)
            .cloned()
            .ok_or_else(|| PocketDocError::unexpected_value(field, purpose, "<missing column>"))
    }

    /// Nullable integer field.
    pub(crate) fn int(&self, field: &str, purpose: &str) -> Result<Option<i64>> {
        match self.text(field, purpose)? {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| PocketDocError::mapping(field, purpose, e)),
        }
    }

    /// `Y`/`YES` flag; anything else, including NULL, is false.
    pub(crate) fn yes(&self, field: &str, purpose: &str) -> Result<bool> {
        Ok(matches!(
            self.text(field, purpose)?.as_deref().map(str::trim),
            Some("Y" | "YES")
        ))
    }

    pub(crate) fn required_text(&self, field: &str, purpose: &str) -> Result<String> {
        self.text(field, purpose)?
            .ok_or_else(|| PocketDocError::unexpected_null(field, purpose))
    }

    pub(crate) fn required_int(&self, field: &str, purpose: &str) -> Result<i64> {
        self.int(field, purpose)?
            .ok_or_else(|| PocketDocError::unexpected_null(field, purpose))
    }
}

/// ISO-8601 rendering of a `DATE` dictionary column.
pub(crate) fn iso_timestamp(column: &str) -> String {
    format!("TO_CHAR({column}, 'YYYY-MM-DD\"T\"HH24:MI:SS')")
}
