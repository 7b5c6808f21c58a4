//! Oracle DML trigger collection from `ALL_TRIGGERS`.
//!
//! `TRIGGERING_EVENT` is already spelled `INSERT OR UPDATE`. Schema and
//! database event triggers have no target table and are skipped, as are
//! compound triggers, which fire at several timing points.

use super::connection::iso_timestamp;
use super::{OracleAdapter, SCOPE};
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::*;
use crate::Result;

/// Parses `ALL_TRIGGERS.TRIGGER_TYPE` (`BEFORE EACH ROW`, `AFTER STATEMENT`,
/// `INSTEAD OF`, ...) into timing and level.
///
/// `INSTEAD OF` triggers always fire per row. Returns `None` for
/// `COMPOUND` and unknown types.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::oracle::parse_trigger_type;
/// use pocketdoc_core::models::{TriggerLevel, TriggerTiming};
///
/// assert_eq!(
///     parse_trigger_type("BEFORE EACH ROW"),
///     Some((TriggerTiming::Before, TriggerLevel::Row))
/// );
/// assert_eq!(parse_trigger_type("COMPOUND"), None);
/// ```
pub fn parse_trigger_type(trigger_type: &str) -> Option<(TriggerTiming, TriggerLevel)> {
    let timing = TriggerTiming::from_catalog(trigger_type)?;
    let level = if timing == TriggerTiming::InsteadOf
        || trigger_type.to_ascii_uppercase().contains("EACH ROW")
    {
        TriggerLevel::Row
    } else {
        TriggerLevel::Statement
    };
    Some((timing, level))
}

pub(crate) async fn collect_triggers(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Trigger>> {
    const PURPOSE: &str = "triggers";
    let filter = adapter.config.schema_filter.clause("t.OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            t.OWNER,
            t.TRIGGER_NAME AS NAME,
            t.TABLE_NAME AS TARGET_TABLE,
            t.BASE_OBJECT_TYPE AS TARGET_TYPE,
            t.TRIGGER_TYPE,
            t.TRIGGERING_EVENT,
            t.STATUS,
            {created} AS CREATED_AT,
            {modified} AS MODIFIED_AT
        FROM ALL_TRIGGERS t
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = t.OWNER
              AND o.OBJECT_NAME = t.TRIGGER_NAME
              AND o.OBJECT_TYPE = 'TRIGGER'
        WHERE t.BASE_OBJECT_TYPE IN ('TABLE', 'VIEW')
          AND {filter}
        ORDER BY t.OWNER, t.TABLE_NAME, t.TRIGGER_NAME
        "#,
        created = iso_timestamp("o.CREATED"),
        modified = iso_timestamp("o.LAST_DDL_TIME"),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut triggers = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = row.required_text("NAME", PURPOSE)?;
        let trigger_type = row.required_text("TRIGGER_TYPE", PURPOSE)?;
        let Some((timing, level)) = parse_trigger_type(&trigger_type) else {
            tracing::warn!("Skipping trigger {} of type {}", name, trigger_type.trim());
            continue;
        };
        let status = match row.required_text("STATUS", PURPOSE)?.as_str() {
            "ENABLED" => TriggerStatus::Enabled,
            "DISABLED" => TriggerStatus::Disabled,
            other => return Err(PocketDocError::unexpected_value("STATUS", PURPOSE, other)),
        };
        triggers.push(Trigger {
            name,
            owner: Some(row.required_text("OWNER", PURPOSE)?),
            target_table: row.required_text("TARGET_TABLE", PURPOSE)?,
            target_type: row.required_text("TARGET_TYPE", PURPOSE)?,
            timing,
            event: row.required_text("TRIGGERING_EVENT", PURPOSE)?.trim().to_string(),
            level,
            status,
            comment: None,
            created_at: row.text("CREATED_AT", PURPOSE)?,
            modified_at: row.text("MODIFIED_AT", PURPOSE)?,
        });
    }
    Ok(triggers)
}
