//! Orchestration tests against an in-memory extractor.
//!
//! These cover step order, fail-fast behavior, cancellation and the root
//! index aggregation without a database.

use async_trait::async_trait;
use pocketdoc_core::{
    ConnectionConfig, ExtractOptions, ExtractionContext, PocketDocError, Result, SchemaExtractor,
    extract_schema, extract_schema_with,
    error::ErrorKind,
    models::*,
};
use std::sync::Mutex;
use std::time::Duration;

/// Records every catalog call and can fail or stall a chosen step.
#[derive(Default)]
struct FakeExtractor {
    config: ConnectionConfig,
    calls: Mutex<Vec<&'static str>>,
    fail_at: Option<&'static str>,
    stall_at: Option<&'static str>,
}

impl FakeExtractor {
    fn failing_at(step: &'static str) -> Self {
        Self {
            fail_at: Some(step),
            ..Default::default()
        }
    }

    fn stalling_at(step: &'static str) -> Self {
        Self {
            stall_at: Some(step),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, step: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(step);
        if self.stall_at == Some(step) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_at == Some(step) {
            return Err(PocketDocError::query_failed(
                step,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }
        Ok(())
    }
}

fn index(name: &str, table: &str) -> Index {
    Index {
        name: name.to_string(),
        table_name: table.to_string(),
        owner: Some("HR".to_string()),
        index_type: "NORMAL".to_string(),
        columns: vec!["ID".to_string()],
        is_unique: true,
        is_primary: true,
        is_enabled: true,
        comment: None,
        created_at: None,
    }
}

fn table(name: &str, indexes: Vec<Index>) -> Table {
    Table {
        name: name.to_string(),
        owner: Some("HR".to_string()),
        table_type: "TABLE".to_string(),
        comment: None,
        columns: vec![Column {
            name: "ID".to_string(),
            position: 1,
            data_type: "NUMBER".to_string(),
            is_primary_key: true,
            ..Default::default()
        }],
        indexes,
        row_count: Some(10),
        created_at: None,
        modified_at: None,
    }
}

#[async_trait]
impl SchemaExtractor for FakeExtractor {
    async fn connect(&mut self, _ctx: &ExtractionContext) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn database_info(&self, _ctx: &ExtractionContext) -> Result<DatabaseInfo> {
        self.enter("database_info").await?;
        Ok(DatabaseInfo {
            name: "HRDB".to_string(),
            version: "Fake 1.0".to_string(),
        })
    }

    async fn tables(&self, _ctx: &ExtractionContext) -> Result<Vec<Table>> {
        self.enter("tables").await?;
        Ok(vec![
            table("EMPLOYEES", vec![index("EMP_PK", "EMPLOYEES"), index("EMP_IX", "EMPLOYEES")]),
            table("AUDIT_LOG", Vec::new()),
            table("DEPARTMENTS", vec![index("DEPT_PK", "DEPARTMENTS")]),
        ])
    }

    async fn views(&self, _ctx: &ExtractionContext) -> Result<Vec<View>> {
        self.enter("views").await?;
        Ok(Vec::new())
    }

    async fn routines(&self, _ctx: &ExtractionContext) -> Result<Vec<Routine>> {
        self.enter("routines").await?;
        Ok(Vec::new())
    }

    async fn sequences(&self, _ctx: &ExtractionContext) -> Result<Vec<Sequence>> {
        self.enter("sequences").await?;
        Ok(Vec::new())
    }

    async fn triggers(&self, _ctx: &ExtractionContext) -> Result<Vec<Trigger>> {
        self.enter("triggers").await?;
        Ok(Vec::new())
    }

    async fn synonyms(&self, _ctx: &ExtractionContext) -> Result<Vec<Synonym>> {
        self.enter("synonyms").await?;
        Ok(Vec::new())
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Oracle
    }

    fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[tokio::test]
async fn test_steps_run_in_fixed_order() {
    let extractor = FakeExtractor::default();
    let schema = extract_schema(&extractor, &ExtractionContext::new())
        .await
        .unwrap();

    assert_eq!(
        extractor.calls(),
        [
            "database_info",
            "tables",
            "views",
            "routines",
            "sequences",
            "triggers",
            "synonyms"
        ]
    );
    assert_eq!(schema.database_name, "HRDB");
    assert_eq!(schema.version, "Fake 1.0");
    assert_eq!(schema.database_type, DatabaseType::Oracle);
}

#[tokio::test]
async fn test_root_indexes_equal_table_indexes() {
    let extractor = FakeExtractor::default();
    let schema = extractor
        .extract_schema(&ExtractionContext::new())
        .await
        .unwrap();

    let nested: Vec<&Index> = schema.tables.iter().flat_map(|t| &t.indexes).collect();
    assert_eq!(schema.indexes.len(), 3);
    for (root, table_copy) in schema.indexes.iter().zip(nested) {
        assert_eq!(root, table_copy);
    }
}

#[tokio::test]
async fn test_failure_aborts_later_steps() {
    let extractor = FakeExtractor::failing_at("routines");
    let err = extract_schema(&extractor, &ExtractionContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(err.to_string().contains("routines"));
    assert_eq!(
        extractor.calls(),
        ["database_info", "tables", "views", "routines"]
    );
}

#[tokio::test]
async fn test_database_info_failure_is_fatal() {
    let extractor = FakeExtractor::failing_at("database_info");
    let err = extract_schema(&extractor, &ExtractionContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert_eq!(extractor.calls(), ["database_info"]);
}

#[tokio::test]
async fn test_cancel_mid_tables_returns_promptly() {
    let extractor = FakeExtractor::stalling_at("tables");
    let ctx = ExtractionContext::new();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), extract_schema(&extractor, &ctx))
        .await
        .expect("extraction did not return after cancellation");
    let err = result.unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(extractor.calls(), ["database_info", "tables"]);
}

#[tokio::test]
async fn test_deadline_mid_tables_returns_cancellation() {
    let extractor = FakeExtractor::stalling_at("tables");
    let ctx = ExtractionContext::new().with_timeout(Duration::from_millis(100));

    let err = tokio::time::timeout(Duration::from_secs(5), extract_schema(&extractor, &ctx))
        .await
        .expect("extraction did not return after the deadline")
        .unwrap_err();
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn test_disabled_kinds_are_skipped_and_empty() {
    let extractor = FakeExtractor::default();
    let options = ExtractOptions {
        include_routines: false,
        include_synonyms: false,
        include_indexes: false,
        ..Default::default()
    };
    let schema = extract_schema_with(&extractor, &ExtractionContext::new(), &options)
        .await
        .unwrap();

    assert!(!extractor.calls().contains(&"routines"));
    assert!(!extractor.calls().contains(&"synonyms"));
    assert!(schema.indexes.is_empty());
    assert!(schema.tables.iter().all(|t| t.indexes.is_empty()));
    assert_eq!(schema.tables.len(), 3);
}

#[tokio::test]
async fn test_boxed_extractor_runs_through_trait_object() {
    let extractor: Box<dyn SchemaExtractor> = Box::new(FakeExtractor::default());
    let schema = extractor
        .extract_schema(&ExtractionContext::new())
        .await
        .unwrap();
    assert_eq!(schema.tables.len(), 3);
}
