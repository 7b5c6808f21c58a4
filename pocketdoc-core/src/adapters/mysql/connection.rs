//! MySQL connection pool management.
//!
//! # Security Features
//! - Connection options are built from fields; the password never appears
//!   in a formatted URL
//! - Every pooled session is read-only, time-limited and pinned to UTC

use super::MySqlAdapter;
use crate::adapters::config::{ConnectionConfig, SslMode};
use crate::adapters::helpers::bind_all;
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::DatabaseType;
use crate::security::Credentials;
use crate::Result;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::MySqlPool;

fn mysql_ssl_mode(mode: SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disable => MySqlSslMode::Disabled,
        SslMode::Prefer => MySqlSslMode::Preferred,
        SslMode::Require => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
    }
}

/// Builds driver connect options from the configuration and credentials.
pub(crate) fn connect_options(
    config: &ConnectionConfig,
    credentials: &Credentials,
) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port_or_default(DatabaseType::MySql))
        .ssl_mode(mysql_ssl_mode(config.ssl_mode))
        .charset("utf8mb4");

    let username = if credentials.username().is_empty() {
        config.username.as_deref().unwrap_or("root")
    } else {
        credentials.username()
    };
    options = options.username(username);

    if let Some(password) = credentials.password() {
        options = options.password(password);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    options
}

/// Creates the pool and verifies it with a round trip.
///
/// # Session Settings (applied to every pooled connection)
/// - `max_execution_time` from `query_timeout`
/// - `SET SESSION TRANSACTION READ ONLY` when `read_only`
/// - `time_zone = '+00:00'`
///
/// # Errors
/// Returns a `Connection` error if the server is unreachable, rejects the
/// credentials, or fails TLS negotiation.
pub(crate) async fn create_pool(
    config: &ConnectionConfig,
    credentials: &Credentials,
) -> Result<MySqlPool> {
    use sqlx::Executor;

    let query_timeout_ms = config.query_timeout.as_millis().max(1000);
    let read_only = config.read_only;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections.min(100))
        .min_connections(0)
        .acquire_timeout(config.connect_timeout)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET max_execution_time = {}", query_timeout_ms).as_str())
                    .await?;
                if read_only {
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                }
                conn.execute("SET time_zone = '+00:00'").await?;
                Ok(())
            })
        })
        .connect_with(connect_options(config, credentials))
        .await
        .map_err(|e| {
            PocketDocError::connection_failed(format!("Failed to connect to MySQL at {}", config), e)
        })?;

    if let Err(e) = sqlx::query_scalar::<_, i64>("SELECT CAST(1 AS SIGNED)")
        .fetch_one(&pool)
        .await
    {
        pool.close().await;
        return Err(PocketDocError::connection_failed(
            format!("MySQL connectivity check failed for {}", config),
            e,
        ));
    }

    tracing::info!("Connected to MySQL at {}", config);
    Ok(pool)
}

impl MySqlAdapter {
    /// Runs one catalog query under the extraction context.
    ///
    /// `?` placeholders are positional, so `binds` must follow the order in
    /// which the placeholders appear in `sql`.
    pub(crate) async fn fetch_rows(
        &self,
        ctx: &ExtractionContext,
        purpose: &str,
        sql: &str,
        binds: &[String],
    ) -> Result<Vec<MySqlRow>> {
        let pool = self.pool()?;
        ctx.run(purpose, async {
            bind_all(sqlx::query(sql), binds)
                .fetch_all(pool)
                .await
                .map_err(|e| PocketDocError::query_failed(purpose, e))
        })
        .await
    }
}
