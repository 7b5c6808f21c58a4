//! PostgreSQL trigger collection.
//!
//! Triggers are read from `pg_trigger`, skipping internal (constraint)
//! triggers. Timing, events and level are decoded from the `tgtype`
//! bitmask; the trigger definition is never read.

use super::{PostgresAdapter, SCOPE};
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

// pg_trigger.tgtype bits
const TRIGGER_TYPE_ROW: i32 = 1;
const TRIGGER_TYPE_BEFORE: i32 = 2;
const TRIGGER_TYPE_INSERT: i32 = 4;
const TRIGGER_TYPE_DELETE: i32 = 8;
const TRIGGER_TYPE_UPDATE: i32 = 16;
const TRIGGER_TYPE_TRUNCATE: i32 = 32;
const TRIGGER_TYPE_INSTEAD: i32 = 64;

pub(crate) async fn collect_triggers(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Trigger>> {
    const PURPOSE: &str = "triggers";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            t.tgname::text AS name,
            c.relname::text AS target_table,
            CASE c.relkind WHEN 'v' THEN 'VIEW' ELSE 'TABLE' END AS target_type,
            t.tgtype::int4 AS trigger_type,
            t.tgenabled::text AS enabled,
            obj_description(t.oid, 'pg_trigger')::text AS comment
        FROM pg_catalog.pg_trigger t
        JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        WHERE NOT t.tgisinternal
          AND {}
        ORDER BY n.nspname, c.relname, t.tgname
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut triggers = Vec::with_capacity(rows.len());
    for row in &rows {
        let (timing, event, level) = decode_trigger_type(row.required("trigger_type", PURPOSE)?);
        let enabled: String = row.required("enabled", PURPOSE)?;
        triggers.push(Trigger {
            name: row.required("name", PURPOSE)?,
            owner: Some(row.required("owner", PURPOSE)?),
            target_table: row.required("target_table", PURPOSE)?,
            target_type: row.required("target_type", PURPOSE)?,
            timing,
            event,
            level,
            status: if enabled == "D" {
                TriggerStatus::Disabled
            } else {
                TriggerStatus::Enabled
            },
            comment: non_empty(row.field("comment", PURPOSE)?),
            created_at: None,
            modified_at: None,
        });
    }
    Ok(triggers)
}

/// Decodes a `pg_trigger.tgtype` bitmask.
///
/// Multiple events are joined with ` OR ` in INSERT, UPDATE, DELETE,
/// TRUNCATE order.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::postgres::decode_trigger_type;
/// use pocketdoc_core::models::{TriggerLevel, TriggerTiming};
///
/// // BEFORE INSERT OR UPDATE ... FOR EACH ROW
/// let (timing, event, level) = decode_trigger_type(1 | 2 | 4 | 16);
/// assert_eq!(timing, TriggerTiming::Before);
/// assert_eq!(event, "INSERT OR UPDATE");
/// assert_eq!(level, TriggerLevel::Row);
/// ```
pub fn decode_trigger_type(tgtype: i32) -> (TriggerTiming, String, TriggerLevel) {
    let timing = if tgtype & TRIGGER_TYPE_INSTEAD != 0 {
        TriggerTiming::InsteadOf
    } else if tgtype & TRIGGER_TYPE_BEFORE != 0 {
        TriggerTiming::Before
    } else {
        TriggerTiming::After
    };

    let events: Vec<&str> = [
        (TRIGGER_TYPE_INSERT, "INSERT"),
        (TRIGGER_TYPE_UPDATE, "UPDATE"),
        (TRIGGER_TYPE_DELETE, "DELETE"),
        (TRIGGER_TYPE_TRUNCATE, "TRUNCATE"),
    ]
    .into_iter()
    .filter(|(bit, _)| tgtype & bit != 0)
    .map(|(_, name)| name)
    .collect();

    let level = if tgtype & TRIGGER_TYPE_ROW != 0 {
        TriggerLevel::Row
    } else {
        TriggerLevel::Statement
    };

    (timing, events.join(" OR "), level)
}
