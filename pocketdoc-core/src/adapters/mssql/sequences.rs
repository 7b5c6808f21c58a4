//! SQL Server sequence collection (`sys.sequences`, SQL Server 2012+).
//!
//! Sequence bounds are `sql_variant` values of the sequence's own type,
//! which may be `decimal(38)`; they are clamped to the `BIGINT` range.

use super::connection::{TdsRowExt, description_join, iso_timestamp};
use super::{SCOPE, SqlServerAdapter};
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

/// Renders `expr` as a `BIGINT`, saturating at the `BIGINT` bounds.
pub(super) fn clamped_bigint(expr: &str) -> String {
    format!(
        "CAST(CASE \
         WHEN CAST({expr} AS DECIMAL(38, 0)) > 9223372036854775807 THEN 9223372036854775807 \
         WHEN CAST({expr} AS DECIMAL(38, 0)) < -9223372036854775808 THEN -9223372036854775808 \
         ELSE CAST({expr} AS DECIMAL(38, 0)) END AS BIGINT)"
    )
}

pub(crate) async fn collect_sequences(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Sequence>> {
    const PURPOSE: &str = "sequences";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            seq.name AS name,
            {min} AS min_value,
            {max} AS max_value,
            {increment} AS increment,
            {current} AS last_number,
            CAST(CASE WHEN seq.is_cached = 1 THEN seq.cache_size END AS BIGINT) AS cache_size,
            seq.is_cycling AS is_cyclic,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            {created} AS created_at
        FROM sys.sequences seq
        JOIN sys.schemas s ON s.schema_id = seq.schema_id
        {description}
        WHERE {filter}
        ORDER BY s.name, seq.name
        "#,
        min = clamped_bigint("seq.minimum_value"),
        max = clamped_bigint("seq.maximum_value"),
        increment = clamped_bigint("seq.increment"),
        current = clamped_bigint("COALESCE(seq.current_value, seq.start_value)"),
        created = iso_timestamp("seq.create_date"),
        description = description_join("ep", "seq.object_id", "0", 1),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    rows.iter()
        .map(|row| {
            Ok(Sequence {
                name: row.required_text("name", PURPOSE)?,
                owner: Some(row.required_text("owner", PURPOSE)?),
                min_value: row.required_int("min_value", PURPOSE)?,
                max_value: row.required_int("max_value", PURPOSE)?,
                increment: row.required_int("increment", PURPOSE)?,
                last_number: row.required_int("last_number", PURPOSE)?,
                cache_size: positive(row.int("cache_size", PURPOSE)?),
                is_cyclic: row.flag("is_cyclic", PURPOSE)?.unwrap_or(false),
                is_ordered: false,
                comment: non_empty(row.text("comment", PURPOSE)?),
                created_at: row.text("created_at", PURPOSE)?,
            })
        })
        .collect()
}
