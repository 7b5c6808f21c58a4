//! PostgreSQL connection pool management.
//!
//! # Security Features
//! - Connection options are built from fields; no URL holding a password is
//!   ever formatted
//! - Every pooled session is read-only, time-limited and pinned to UTC
//! - Connection limits stay small: extraction issues one query at a time

use super::PostgresAdapter;
use crate::adapters::config::{ConnectionConfig, SslMode};
use crate::adapters::helpers::bind_all;
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::DatabaseType;
use crate::security::Credentials;
use crate::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::PgPool;

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Builds driver connect options from the configuration and credentials.
pub(crate) fn connect_options(config: &ConnectionConfig, credentials: &Credentials) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port_or_default(DatabaseType::PostgreSql))
        .ssl_mode(pg_ssl_mode(config.ssl_mode))
        .application_name(config.application_name());

    let username = if credentials.username().is_empty() {
        config.username.as_deref().unwrap_or("postgres")
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
/// - `statement_timeout` from `query_timeout`
/// - `default_transaction_read_only = on` when `read_only`
/// - `TimeZone = 'UTC'`
///
/// # Errors
/// Returns a `Connection` error if the server is unreachable, rejects the
/// credentials, or fails TLS negotiation.
pub(crate) async fn create_pool(
    config: &ConnectionConfig,
    credentials: &Credentials,
) -> Result<PgPool> {
    use sqlx::Executor;

    let query_timeout_secs = config.query_timeout.as_secs().max(1);
    let read_only = config.read_only;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections.min(100))
        .min_connections(0)
        .acquire_timeout(config.connect_timeout)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET statement_timeout = '{}s'", query_timeout_secs).as_str())
                    .await?;
                if read_only {
                    conn.execute("SET default_transaction_read_only = on").await?;
                }
                conn.execute("SET TimeZone = 'UTC'").await?;
                Ok(())
            })
        })
        .connect_with(connect_options(config, credentials))
        .await
        .map_err(|e| {
            PocketDocError::connection_failed(
                format!("Failed to connect to PostgreSQL at {}", config),
                e,
            )
        })?;

    if let Err(e) = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await {
        pool.close().await;
        return Err(PocketDocError::connection_failed(
            format!("PostgreSQL connectivity check failed for {}", config),
            e,
        ));
    }

    tracing::info!("Connected to PostgreSQL at {}", config);
    Ok(pool)
}

impl PostgresAdapter {
    /// Runs one catalog query under the extraction context.
    ///
    /// # Arguments
    /// * `purpose` - What the query fetches; becomes the error context
    /// * `sql` - Query text with `$n` placeholders
    /// * `binds` - Text values bound in order
    pub(crate) async fn fetch_rows(
        &self,
        ctx: &ExtractionContext,
        purpose: &str,
        sql: &str,
        binds: &[String],
    ) -> Result<Vec<PgRow>> {
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
