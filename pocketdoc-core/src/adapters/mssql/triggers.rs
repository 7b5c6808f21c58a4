//! SQL Server DML trigger collection.
//!
//! Events come from `OBJECTPROPERTY(..., 'ExecIs*Trigger')`; a trigger
//! covering several events reports them joined with ` OR `. T-SQL triggers
//! fire once per statement, so level is always `STATEMENT`. Database-level
//! DDL triggers have no target table and are skipped.

use super::connection::{TdsRowExt, description_join, iso_timestamp};
use super::{SCOPE, SqlServerAdapter};
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

/// Joins the fired events in INSERT, UPDATE, DELETE order.
pub(super) fn join_events(insert: bool, update: bool, delete: bool) -> String {
    [(insert, "INSERT"), (update, "UPDATE"), (delete, "DELETE")]
        .into_iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, name)| name)
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub(crate) async fn collect_triggers(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Trigger>> {
    const PURPOSE: &str = "triggers";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            tr.name AS name,
            o.name AS target_table,
            CAST(CASE o.type WHEN 'V' THEN 'VIEW' ELSE 'TABLE' END AS NVARCHAR(5)) AS target_type,
            tr.is_instead_of_trigger AS is_instead_of,
            tr.is_disabled AS is_disabled,
            CAST(OBJECTPROPERTY(tr.object_id, 'ExecIsInsertTrigger') AS BIGINT) AS on_insert,
            CAST(OBJECTPROPERTY(tr.object_id, 'ExecIsUpdateTrigger') AS BIGINT) AS on_update,
            CAST(OBJECTPROPERTY(tr.object_id, 'ExecIsDeleteTrigger') AS BIGINT) AS on_delete,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            {created} AS created_at,
            {modified} AS modified_at
        FROM sys.triggers tr
        JOIN sys.objects o ON o.object_id = tr.parent_id
        JOIN sys.schemas s ON s.schema_id = o.schema_id
        {description}
        WHERE tr.parent_class = 1
          AND tr.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, o.name, tr.name
        "#,
        created = iso_timestamp("tr.create_date"),
        modified = iso_timestamp("tr.modify_date"),
        description = description_join("ep", "tr.object_id", "0", 1),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut triggers = Vec::with_capacity(rows.len());
    for row in &rows {
        let event = join_events(
            row.int("on_insert", PURPOSE)? == Some(1),
            row.int("on_update", PURPOSE)? == Some(1),
            row.int("on_delete", PURPOSE)? == Some(1),
        );
        let instead_of = row.flag("is_instead_of", PURPOSE)?.unwrap_or(false);
        let disabled = row.flag("is_disabled", PURPOSE)?.unwrap_or(false);
        triggers.push(Trigger {
            name: row.required_text("name", PURPOSE)?,
            owner: Some(row.required_text("owner", PURPOSE)?),
            target_table: row.required_text("target_table", PURPOSE)?,
            target_type: row.required_text("target_type", PURPOSE)?,
            timing: if instead_of {
                TriggerTiming::InsteadOf
            } else {
                TriggerTiming::After
            },
            event,
            level: TriggerLevel::Statement,
            status: if disabled {
                TriggerStatus::Disabled
            } else {
                TriggerStatus::Enabled
            },
            comment: non_empty(row.text("comment", PURPOSE)?),
            created_at: row.text("created_at", PURPOSE)?,
            modified_at: row.text("modified_at", PURPOSE)?,
        });
    }
    Ok(triggers)
}
