//! MySQL view collection.
//!
//! `INFORMATION_SCHEMA.TABLES` reports the comment of every view as the
//! literal `VIEW`; that placeholder is dropped.

use super::{MySqlAdapter, SCOPE, TIMESTAMP_FORMAT, schema_collection::fetch_columns};
use crate::adapters::constraints::TableKey;
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

pub(crate) async fn collect_views(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<View>> {
    const PURPOSE: &str = "views";
    let filter = adapter.config.schema_filter.clause("v.TABLE_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(v.TABLE_SCHEMA AS CHAR) AS owner,
            CAST(v.TABLE_NAME AS CHAR) AS name,
            CAST(v.IS_UPDATABLE AS CHAR) AS is_updatable,
            CAST(NULLIF(t.TABLE_COMMENT, 'VIEW') AS CHAR) AS comment,
            CAST(DATE_FORMAT(t.CREATE_TIME, '{ts}') AS CHAR) AS created_at
        FROM INFORMATION_SCHEMA.VIEWS v
        LEFT JOIN INFORMATION_SCHEMA.TABLES t
               ON t.TABLE_SCHEMA = v.TABLE_SCHEMA AND t.TABLE_NAME = v.TABLE_NAME
        WHERE {filter}
        ORDER BY v.TABLE_SCHEMA, v.TABLE_NAME
        "#,
        ts = TIMESTAMP_FORMAT,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;
    let mut columns = fetch_columns(adapter, ctx, "VIEW").await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner: String = row.required("owner", PURPOSE)?;
        let name: String = row.required("name", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());
        let is_updatable: String = row.required("is_updatable", PURPOSE)?;
        tracing::debug!("Collected view {}", key);
        views.push(View {
            name,
            owner: Some(owner),
            view_type: "VIEW".to_string(),
            comment: non_empty(row.field("comment", PURPOSE)?),
            columns: columns.remove(&key).unwrap_or_default(),
            is_updatable: is_updatable.eq_ignore_ascii_case("YES"),
            created_at: row.field("created_at", PURPOSE)?,
            modified_at: None,
        });
    }
    Ok(views)
}
