//! PostgreSQL view collection.
//!
//! Covers plain and materialized views. Updatability comes from
//! `information_schema.views.is_updatable`; materialized views are never
//! updatable. View query text is not read.

use super::{PostgresAdapter, SCOPE, schema_collection::fetch_columns};
use crate::adapters::constraints::TableKey;
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

pub(crate) async fn collect_views(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<View>> {
    const PURPOSE: &str = "views";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            c.relname::text AS name,
            CASE c.relkind WHEN 'm' THEN 'MATERIALIZED VIEW' ELSE 'VIEW' END AS view_type,
            obj_description(c.oid, 'pg_class')::text AS comment,
            COALESCE(v.is_updatable::text = 'YES', false) AS is_updatable
        FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN information_schema.views v
               ON v.table_schema = n.nspname AND v.table_name = c.relname
        WHERE c.relkind IN ('v', 'm')
          AND {}
        ORDER BY n.nspname, c.relname
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;
    let mut columns = fetch_columns(adapter, ctx, "'v', 'm'").await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner: String = row.required("owner", PURPOSE)?;
        let name: String = row.required("name", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());
        tracing::debug!("Collected view {}", key);
        views.push(View {
            name,
            owner: Some(owner),
            view_type: row.required("view_type", PURPOSE)?,
            comment: non_empty(row.field("comment", PURPOSE)?),
            columns: columns.remove(&key).unwrap_or_default(),
            is_updatable: row.required("is_updatable", PURPOSE)?,
            created_at: None,
            modified_at: None,
        });
    }
    Ok(views)
}
