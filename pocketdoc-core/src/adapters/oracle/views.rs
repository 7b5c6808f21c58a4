//! Oracle view and materialized view collection.
//!
//! Plain views are updatable unless created `WITH READ ONLY`; materialized
//! views report their own `UPDATABLE` flag. `ALL_VIEWS.TEXT` and
//! `ALL_MVIEWS.QUERY` are never selected.

use super::connection::iso_timestamp;
use super::schema_collection::fetch_columns;
use super::{OracleAdapter, SCOPE};
use crate::adapters::constraints::TableKey;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

pub(crate) async fn collect_views(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<View>> {
    const PURPOSE: &str = "views";
    let plain = adapter.config.schema_filter.clause("v.OWNER", &SCOPE, 1);
    let materialized = adapter
        .config
        .schema_filter
        .clause("mv.OWNER", &SCOPE, plain.next_index(1));
    let query = format!(
        r#"
        SELECT
            v.OWNER,
            v.VIEW_NAME AS NAME,
            'VIEW' AS VIEW_TYPE,
            tc.COMMENTS AS VIEW_COMMENT,
            CASE WHEN v.READ_ONLY = 'Y' THEN 'N' ELSE 'Y' END AS IS_UPDATABLE,
            {created} AS CREATED_AT,
            {modified} AS MODIFIED_AT
        FROM ALL_VIEWS v
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = v.OWNER
              AND o.OBJECT_NAME = v.VIEW_NAME
              AND o.OBJECT_TYPE = 'VIEW'
        LEFT JOIN ALL_TAB_COMMENTS tc
               ON tc.OWNER = v.OWNER
              AND tc.TABLE_NAME = v.VIEW_NAME
        WHERE {plain}
        UNION ALL
        SELECT
            mv.OWNER,
            mv.MVIEW_NAME,
            'MATERIALIZED VIEW',
            mc.COMMENTS,
            mv.UPDATABLE,
            {created},
            {modified}
        FROM ALL_MVIEWS mv
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = mv.OWNER
              AND o.OBJECT_NAME = mv.MVIEW_NAME
              AND o.OBJECT_TYPE = 'MATERIALIZED VIEW'
        LEFT JOIN ALL_MVIEW_COMMENTS mc
               ON mc.OWNER = mv.OWNER
              AND mc.MVIEW_NAME = mv.MVIEW_NAME
        WHERE {materialized}
        ORDER BY 1, 2
        "#,
        created = iso_timestamp("o.CREATED"),
        modified = iso_timestamp("o.LAST_DDL_TIME"),
        plain = plain.sql,
        materialized = materialized.sql
    );
    let mut binds = plain.binds;
    binds.extend(materialized.binds);
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &binds).await?;

    // Materialized view columns are listed under the view's own name
    let mut columns = fetch_columns(adapter, ctx, "VIEW").await?;
    columns.extend(fetch_columns(adapter, ctx, "MATERIALIZED VIEW").await?);

    let mut views = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("OWNER", PURPOSE)?;
        let name = row.required_text("NAME", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());
        tracing::debug!("Collected view {}", key);
        views.push(View {
            name,
            owner: Some(owner),
            view_type: row.required_text("VIEW_TYPE", PURPOSE)?,
            comment: non_empty(row.text("VIEW_COMMENT", PURPOSE)?),
            columns: columns.remove(&key).unwrap_or_default(),
            is_updatable: row.yes("IS_UPDATABLE", PURPOSE)?,
            created_at: row.text("CREATED_AT", PURPOSE)?,
            modified_at: row.text("MODIFIED_AT", PURPOSE)?,
        });
    }
    Ok(views)
}
