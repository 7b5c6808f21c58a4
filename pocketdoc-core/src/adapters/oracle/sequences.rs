//! Oracle sequence collection from `ALL_SEQUENCES`.
//!
//! `MAX_VALUE` defaults to 10^28 - 1 for ascending sequences, beyond the
//! range of `i64`; bounds are clamped in the query.

use super::connection::iso_timestamp;
use super::{OracleAdapter, SCOPE};
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

/// Renders `expr` clamped to the `i64` range.
pub(super) fn clamped_number(expr: &str) -> String {
    format!("LEAST(GREATEST({expr}, -9223372036854775808), 9223372036854775807)")
}

pub(crate) async fn collect_sequences(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Sequence>> {
    const PURPOSE: &str = "sequences";
    let filter = adapter
        .config
        .schema_filter
        .clause("s.SEQUENCE_OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.SEQUENCE_OWNER AS OWNER,
            s.SEQUENCE_NAME AS NAME,
            {min} AS MIN_VALUE,
            {max} AS MAX_VALUE,
            {increment} AS INCREMENT_BY,
            {last} AS LAST_NUMBER,
            s.CACHE_SIZE,
            s.CYCLE_FLAG,
            s.ORDER_FLAG,
            {created} AS CREATED_AT
        FROM ALL_SEQUENCES s
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = s.SEQUENCE_OWNER
              AND o.OBJECT_NAME = s.SEQUENCE_NAME
              AND o.OBJECT_TYPE = 'SEQUENCE'
        WHERE {filter}
        ORDER BY s.SEQUENCE_OWNER, s.SEQUENCE_NAME
        "#,
        min = clamped_number("s.MIN_VALUE"),
        max = clamped_number("s.MAX_VALUE"),
        increment = clamped_number("s.INCREMENT_BY"),
        last = clamped_number("s.LAST_NUMBER"),
        created = iso_timestamp("o.CREATED"),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    rows.iter()
        .map(|row| {
            Ok(Sequence {
                name: row.required_text("NAME", PURPOSE)?,
                owner: Some(row.required_text("OWNER", PURPOSE)?),
                min_value: row.required_int("MIN_VALUE", PURPOSE)?,
                max_value: row.required_int("MAX_VALUE", PURPOSE)?,
                increment: row.required_int("INCREMENT_BY", PURPOSE)?,
                last_number: row.required_int("LAST_NUMBER", PURPOSE)?,
                cache_size: positive(row.int("CACHE_SIZE", PURPOSE)?),
                is_cyclic: row.yes("CYCLE_FLAG", PURPOSE)?,
                is_ordered: row.yes("ORDER_FLAG", PURPOSE)?,
                comment: None,
                created_at: row.text("CREATED_AT", PURPOSE)?,
            })
        })
        .collect()
}
