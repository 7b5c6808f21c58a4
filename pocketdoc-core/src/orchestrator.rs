//! Extraction orchestration.
//!
//! Runs the catalog steps of one extractor in a fixed order and assembles
//! the [`Schema`]:
//!
//! 1. database info
//! 2. tables (columns and indexes nested)
//! 3. views (columns nested)
//! 4. routines (arguments and signature nested)
//! 5. sequences
//! 6. triggers
//! 7. synonyms
//! 8. root index collection, copied from the tables
//!
//! The first failing step aborts the run and its error is returned; no
//! partial schema is ever produced. Each step is raced against the
//! extraction context, so a cancelled run returns promptly even if an
//! adapter ignores the context.

use crate::{
    Result,
    adapters::SchemaExtractor,
    context::ExtractionContext,
    models::{Index, ObjectKind, Schema, Table},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info};

fn enabled() -> bool {
    true
}

/// Object kinds to collect. Disabled kinds are left empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Collect tables.
    #[serde(default = "enabled")]
    pub include_tables: bool,
    /// Collect views.
    #[serde(default = "enabled")]
    pub include_views: bool,
    /// Collect procedures and functions.
    #[serde(default = "enabled")]
    pub include_routines: bool,
    /// Collect sequences.
    #[serde(default = "enabled")]
    pub include_sequences: bool,
    /// Collect triggers.
    #[serde(default = "enabled")]
    pub include_triggers: bool,
    /// Collect synonyms.
    #[serde(default = "enabled")]
    pub include_synonyms: bool,
    /// Attach indexes to collected tables.
    #[serde(default = "enabled")]
    pub include_indexes: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_tables: true,
            include_views: true,
            include_routines: true,
            include_sequences: true,
            include_triggers: true,
            include_synonyms: true,
            include_indexes: true,
        }
    }
}

impl ExtractOptions {
    /// Whether `kind` is collected.
    pub fn includes(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Tables => self.include_tables,
            ObjectKind::Views => self.include_views,
            ObjectKind::Routines => self.include_routines,
            ObjectKind::Sequences => self.include_sequences,
            ObjectKind::Triggers => self.include_triggers,
            ObjectKind::Synonyms => self.include_synonyms,
            ObjectKind::Indexes => self.include_indexes,
        }
    }
}

async fn step<T, F>(ctx: &ExtractionContext, name: &str, future: F) -> Result<Vec<T>>
where
    F: Future<Output = Result<Vec<T>>>,
{
    let started = Instant::now();
    debug!("Fetching {}", name);
    let items = ctx
        .run(&format!("fetching {}", name), future)
        .await
        .map_err(|e| e.within(name))?;
    info!(
        "Fetched {} {} in {:.2}s",
        items.len(),
        name,
        started.elapsed().as_secs_f64()
    );
    Ok(items)
}

/// Root index collection: each table's indexes, in table order.
pub fn aggregate_indexes(tables: &[Table]) -> Vec<Index> {
    tables
        .iter()
        .flat_map(|table| table.indexes.iter().cloned())
        .collect()
}

/// Runs a full extraction with every object kind enabled.
///
/// # Errors
/// Returns the first step error, a cancellation error if `ctx` is
/// cancelled or expires, and never a partial schema.
pub async fn extract_schema<E>(extractor: &E, ctx: &ExtractionContext) -> Result<Schema>
where
    E: SchemaExtractor + ?Sized,
{
    extract_schema_with(extractor, ctx, &ExtractOptions::default()).await
}

/// Runs an extraction collecting only the kinds enabled in `options`.
///
/// # Errors
/// See [`extract_schema`].
pub async fn extract_schema_with<E>(
    extractor: &E,
    ctx: &ExtractionContext,
    options: &ExtractOptions,
) -> Result<Schema>
where
    E: SchemaExtractor + ?Sized,
{
    let started = Instant::now();
    let database_type = extractor.database_type();
    info!(
        "Extracting {} catalog from {}",
        database_type,
        extractor.connection_config()
    );

    let info = ctx
        .run("fetching database info", extractor.database_info(ctx))
        .await
        .map_err(|e| e.within("database info"))?;
    let mut schema = Schema::new(database_type, info);

    if options.include_tables {
        schema.tables = step(ctx, "tables", extractor.tables(ctx)).await?;
        if !options.include_indexes {
            for table in &mut schema.tables {
                table.indexes.clear();
            }
        }
    }
    if options.include_views {
        schema.views = step(ctx, "views", extractor.views(ctx)).await?;
    }
    if options.include_routines {
        schema.routines = step(ctx, "routines", extractor.routines(ctx)).await?;
    }
    if options.include_sequences {
        schema.sequences = step(ctx, "sequences", extractor.sequences(ctx)).await?;
    }
    if options.include_triggers {
        schema.triggers = step(ctx, "triggers", extractor.triggers(ctx)).await?;
    }
    if options.include_synonyms {
        schema.synonyms = step(ctx, "synonyms", extractor.synonyms(ctx)).await?;
    }
    if options.include_indexes {
        schema.indexes = aggregate_indexes(&schema.tables);
    }

    info!(
        "Extracted {} objects from {} ({}) in {:.2}s",
        schema.object_count(),
        schema.database_name,
        database_type,
        started.elapsed().as_secs_f64()
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(name: &str, table: &str) -> Index {
        Index {
            name: name.to_string(),
            table_name: table.to_string(),
            owner: Some("HR".to_string()),
            index_type: "NORMAL".to_string(),
            columns: vec!["ID".to_string()],
            is_unique: true,
            is_primary: false,
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
            columns: Vec::new(),
            indexes,
            row_count: None,
            created_at: None,
            modified_at: None,
        }
    }

    #[test]
    fn test_aggregate_indexes_in_table_order() {
        let tables = vec![
            table("A", vec![index("A_PK", "A"), index("A_IX", "A")]),
            table("B", Vec::new()),
            table("C", vec![index("C_PK", "C")]),
        ];
        let names: Vec<String> = aggregate_indexes(&tables)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["A_PK", "A_IX", "C_PK"]);
    }

    #[test]
    fn test_options_default_all_enabled() {
        let options = ExtractOptions::default();
        for kind in [
            ObjectKind::Tables,
            ObjectKind::Views,
            ObjectKind::Routines,
            ObjectKind::Sequences,
            ObjectKind::Triggers,
            ObjectKind::Synonyms,
            ObjectKind::Indexes,
        ] {
            assert!(options.includes(kind));
        }
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: ExtractOptions =
            serde_json::from_str(r#"{"include_routines": false}"#).unwrap();
        assert!(!options.includes(ObjectKind::Routines));
        assert!(options.includes(ObjectKind::Tables));
    }
}
