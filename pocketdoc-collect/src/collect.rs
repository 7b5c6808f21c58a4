//! Connect, extract, close and write.

use crate::config::Target;
use pocketdoc_core::{
    DatabaseInfo, ExtractOptions, ExtractionContext, ExtractorRegistry, PocketDocError, Result,
    Schema, SchemaExtractor, extract_schema_with,
};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn build(target: Target) -> Result<Box<dyn SchemaExtractor>> {
    info!(
        "Creating {} extractor for {}",
        target.database_type, target.config
    );
    ExtractorRegistry::builtin().create(target.database_type, target.config, target.credentials)
}

/// Closes `extractor`, logging instead of failing so the run's own result
/// is never masked.
async fn close_quietly(extractor: &mut dyn SchemaExtractor) {
    if let Err(e) = extractor.close().await {
        warn!("Failed to close connection cleanly: {}", e);
    }
}

/// Runs a full extraction on an unconnected extractor.
///
/// The connection is closed on every path, including connect failures
/// and cancellation.
///
/// # Errors
/// Returns the connect or extraction error.
pub async fn collect_with(
    extractor: &mut dyn SchemaExtractor,
    options: &ExtractOptions,
    ctx: &ExtractionContext,
) -> Result<Schema> {
    let started = Instant::now();
    let result = match extractor.connect(ctx).await {
        Ok(()) => extract_schema_with(&*extractor, ctx, options).await,
        Err(e) => Err(e),
    };
    close_quietly(extractor).await;

    match &result {
        Ok(schema) => info!(
            "Collected {} objects in {:.2}s",
            schema.object_count(),
            started.elapsed().as_secs_f64()
        ),
        Err(e) if e.is_cancellation() => warn!("Collection stopped: {}", e),
        Err(e) => error!("Schema collection failed: {}", e),
    }
    result
}

/// Builds the extractor for `target` and runs [`collect_with`].
///
/// # Errors
/// Returns factory, connect or extraction errors.
pub async fn collect(
    target: Target,
    options: &ExtractOptions,
    ctx: &ExtractionContext,
) -> Result<Schema> {
    let mut extractor = build(target)?;
    collect_with(extractor.as_mut(), options, ctx).await
}

/// Connects, reads the database name and version, and closes.
///
/// # Errors
/// Returns factory, connect or query errors.
pub async fn test_connection(target: Target, ctx: &ExtractionContext) -> Result<DatabaseInfo> {
    let mut extractor = build(target)?;
    let result = match extractor.connect(ctx).await {
        Ok(()) => extractor.database_info(ctx).await,
        Err(e) => Err(e),
    };
    close_quietly(extractor.as_mut()).await;
    result
}

/// Writes the schema as pretty JSON to `path`, or stdout when `None`.
///
/// # Errors
/// Returns a serialization error, or a configuration error naming the
/// path when the file cannot be written.
pub async fn write_output(schema: &Schema, path: Option<&Path>) -> Result<()> {
    let json = schema.to_json_pretty()?;
    match path {
        Some(path) => {
            tokio::fs::write(path, json).await.map_err(|e| {
                PocketDocError::configuration(format!(
                    "failed to write output to {}: {}",
                    path.display(),
                    e
                ))
            })?;
            info!("Schema saved to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Cancels `token` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    warn!("Interrupt received, cancelling extraction");
                    token.cancel();
                }
            }
            () = token.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pocketdoc_core::{ConnectionConfig, error::ErrorKind, models::*};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Recording {
        config: ConnectionConfig,
        fail_connect: bool,
        fail_tables: bool,
        closed: AtomicBool,
    }

    #[async_trait]
    impl SchemaExtractor for Recording {
        async fn connect(&mut self, _ctx: &ExtractionContext) -> Result<()> {
            if self.fail_connect {
                return Err(PocketDocError::connection_failed(
                    "connecting",
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                ));
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn database_info(&self, _ctx: &ExtractionContext) -> Result<DatabaseInfo> {
            Ok(DatabaseInfo {
                name: "shop".to_string(),
                version: "8.4.0".to_string(),
            })
        }

        async fn tables(&self, _ctx: &ExtractionContext) -> Result<Vec<Table>> {
            if self.fail_tables {
                return Err(PocketDocError::query_failed(
                    "tables",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
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
            DatabaseType::MySql
        }

        fn connection_config(&self) -> &ConnectionConfig {
            &self.config
        }
    }

    #[tokio::test]
    async fn test_collect_closes_after_success() {
        let mut extractor = Recording::default();
        let schema = collect_with(
            &mut extractor,
            &ExtractOptions::default(),
            &ExtractionContext::new(),
        )
        .await
        .unwrap();
        assert_eq!(schema.database_name, "shop");
        assert!(extractor.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_collect_closes_after_extraction_failure() {
        let mut extractor = Recording {
            fail_tables: true,
            ..Default::default()
        };
        let err = collect_with(
            &mut extractor,
            &ExtractOptions::default(),
            &ExtractionContext::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        assert!(extractor.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_collect_closes_after_connect_failure() {
        let mut extractor = Recording {
            fail_connect: true,
            ..Default::default()
        };
        let err = collect_with(
            &mut extractor,
            &ExtractOptions::default(),
            &ExtractionContext::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(extractor.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_collect_honors_cancelled_context() {
        let mut extractor = Recording::default();
        let ctx = ExtractionContext::new();
        ctx.cancel();
        let err = collect_with(&mut extractor, &ExtractOptions::default(), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(extractor.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let schema = Schema::new(
            DatabaseType::MySql,
            DatabaseInfo {
                name: "shop".to_string(),
                version: "8.4.0".to_string(),
            },
        );

        write_output(&schema, Some(&path)).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["databaseName"], "shop");
        assert_eq!(written["databaseType"], "mysql");
    }

    #[tokio::test]
    async fn test_write_output_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("schema.json");
        let schema = Schema::new(
            DatabaseType::Oracle,
            DatabaseInfo {
                name: "ORCL".to_string(),
                version: "23ai".to_string(),
            },
        );
        let err = write_output(&schema, Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("schema.json"));
    }
}
