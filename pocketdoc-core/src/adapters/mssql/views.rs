//! SQL Server view collection.
//!
//! A view is reported updatable when an `INSTEAD OF` trigger is attached to
//! it. Module text is never inspected.

use super::connection::{TdsRowExt, description_join, iso_timestamp};
use super::schema_collection::fetch_columns;
use super::{SCOPE, SqlServerAdapter};
use crate::adapters::constraints::TableKey;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

pub(crate) async fn collect_views(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<View>> {
    const PURPOSE: &str = "views";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            v.name AS name,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            CAST(CASE WHEN EXISTS (
                SELECT 1 FROM sys.triggers tr
                WHERE tr.parent_id = v.object_id AND tr.is_instead_of_trigger = 1
            ) THEN 1 ELSE 0 END AS BIT) AS is_updatable,
            {created} AS created_at,
            {modified} AS modified_at
        FROM sys.views v
        JOIN sys.schemas s ON s.schema_id = v.schema_id
        {description}
        WHERE v.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, v.name
        "#,
        created = iso_timestamp("v.create_date"),
        modified = iso_timestamp("v.modify_date"),
        description = description_join("ep", "v.object_id", "0", 1),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;
    let mut columns = fetch_columns(adapter, ctx, "V").await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("owner", PURPOSE)?;
        let name = row.required_text("name", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());
        tracing::debug!("Collected view {}", key);
        views.push(View {
            name,
            owner: Some(owner),
            view_type: "VIEW".to_string(),
            comment: non_empty(row.text("comment", PURPOSE)?),
            columns: columns.remove(&key).unwrap_or_default(),
            is_updatable: row.flag("is_updatable", PURPOSE)?.unwrap_or(false),
            created_at: row.text("created_at", PURPOSE)?,
            modified_at: row.text("modified_at", PURPOSE)?,
        });
    }
    Ok(views)
}
