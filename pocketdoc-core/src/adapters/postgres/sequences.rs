//! PostgreSQL sequence collection (`pg_sequence`, PostgreSQL 10+).

use super::{PostgresAdapter, SCOPE};
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

/// Collects sequences in scope.
///
/// `last_number` is the last value handed out, or the start value when the
/// sequence has never been used or `pg_sequences` hides it from the
/// current role. PostgreSQL has no ORDER option, so `is_ordered` is false.
pub(crate) async fn collect_sequences(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Sequence>> {
    const PURPOSE: &str = "sequences";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            c.relname::text AS name,
            s.seqmin AS min_value,
            s.seqmax AS max_value,
            s.seqincrement AS increment,
            COALESCE(ps.last_value, s.seqstart) AS last_number,
            s.seqcache AS cache_size,
            s.seqcycle AS is_cyclic,
            obj_description(c.oid, 'pg_class')::text AS comment
        FROM pg_catalog.pg_sequence s
        JOIN pg_catalog.pg_class c ON c.oid = s.seqrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_catalog.pg_sequences ps
               ON ps.schemaname = n.nspname AND ps.sequencename = c.relname
        WHERE {}
        ORDER BY n.nspname, c.relname
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    rows.iter()
        .map(|row| {
            Ok(Sequence {
                name: row.required("name", PURPOSE)?,
                owner: Some(row.required("owner", PURPOSE)?),
                min_value: row.required("min_value", PURPOSE)?,
                max_value: row.required("max_value", PURPOSE)?,
                increment: row.required("increment", PURPOSE)?,
                last_number: row.required("last_number", PURPOSE)?,
                cache_size: positive(row.field("cache_size", PURPOSE)?),
                is_cyclic: row.required("is_cyclic", PURPOSE)?,
                is_ordered: false,
                comment: non_empty(row.field("comment", PURPOSE)?),
                created_at: None,
            })
        })
        .collect()
}
