//! MySQL trigger collection.
//!
//! MySQL triggers are always row-level and cannot be disabled, so level is
//! `ROW` and status `ENABLED`. `ACTION_STATEMENT` is never selected.

use super::{MySqlAdapter, SCOPE, TIMESTAMP_FORMAT};
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::*;
use crate::Result;

pub(crate) async fn collect_triggers(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Trigger>> {
    const PURPOSE: &str = "triggers";
    let filter = adapter.config.schema_filter.clause("tr.TRIGGER_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(tr.TRIGGER_SCHEMA AS CHAR) AS owner,
            CAST(tr.TRIGGER_NAME AS CHAR) AS name,
            CAST(tr.EVENT_OBJECT_TABLE AS CHAR) AS target_table,
            CAST(tr.ACTION_TIMING AS CHAR) AS timing,
            CAST(tr.EVENT_MANIPULATION AS CHAR) AS event,
            CAST(DATE_FORMAT(tr.CREATED, '{ts}') AS CHAR) AS created_at
        FROM INFORMATION_SCHEMA.TRIGGERS tr
        WHERE {filter}
        ORDER BY tr.TRIGGER_SCHEMA, tr.EVENT_OBJECT_TABLE, tr.TRIGGER_NAME
        "#,
        ts = TIMESTAMP_FORMAT,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut triggers = Vec::with_capacity(rows.len());
    for row in &rows {
        let timing: String = row.required("timing", PURPOSE)?;
        let timing = TriggerTiming::from_catalog(&timing)
            .ok_or_else(|| PocketDocError::unexpected_value("timing", PURPOSE, &timing))?;
        triggers.push(Trigger {
            name: row.required("name", PURPOSE)?,
            owner: Some(row.required("owner", PURPOSE)?),
            target_table: row.required("target_table", PURPOSE)?,
            target_type: "TABLE".to_string(),
            timing,
            event: row.required("event", PURPOSE)?,
            level: TriggerLevel::Row,
            status: TriggerStatus::Enabled,
            comment: None,
            created_at: row.field("created_at", PURPOSE)?,
            modified_at: None,
        });
    }
    Ok(triggers)
}
