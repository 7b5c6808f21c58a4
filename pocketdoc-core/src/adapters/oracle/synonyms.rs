//! Oracle synonym collection from `ALL_SYNONYMS`.
//!
//! Public synonyms are owned by `PUBLIC` and appear only when `PUBLIC` is
//! in the schema filter. Targets behind a database link are reported as
//! `OBJECT@LINK` without a type.

use super::connection::iso_timestamp;
use super::{OracleAdapter, SCOPE};
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

/// Object types a synonym target is resolved to, in `ALL_OBJECTS` spelling.
const TARGET_TYPES: &str = "'TABLE', 'VIEW', 'MATERIALIZED VIEW', 'SEQUENCE', 'PROCEDURE', \
                            'FUNCTION', 'PACKAGE', 'TYPE', 'SYNONYM'";

/// Target object name, suffixed with `@LINK` for remote targets.
pub(super) fn target_object(name: String, db_link: Option<&str>) -> String {
    match db_link.map(str::trim).filter(|link| !link.is_empty()) {
        Some(link) => format!("{}@{}", name, link),
        None => name,
    }
}

pub(crate) async fn collect_synonyms(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Synonym>> {
    const PURPOSE: &str = "synonyms";
    let filter = adapter.config.schema_filter.clause("s.OWNER", &SCOPE, 1);
    // MIN prefers MATERIALIZED VIEW over its container TABLE
    let query = format!(
        r#"
        SELECT
            s.OWNER,
            s.SYNONYM_NAME AS NAME,
            s.TABLE_OWNER AS TARGET_OWNER,
            s.TABLE_NAME AS TARGET_OBJECT,
            s.DB_LINK,
            CASE WHEN s.DB_LINK IS NULL THEN (
                SELECT MIN(t.OBJECT_TYPE) FROM ALL_OBJECTS t
                WHERE t.OWNER = s.TABLE_OWNER
                  AND t.OBJECT_NAME = s.TABLE_NAME
                  AND t.OBJECT_TYPE IN ({types})
            ) END AS TARGET_TYPE,
            {created} AS CREATED_AT
        FROM ALL_SYNONYMS s
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = s.OWNER
              AND o.OBJECT_NAME = s.SYNONYM_NAME
              AND o.OBJECT_TYPE = 'SYNONYM'
        WHERE {filter}
        ORDER BY s.OWNER, s.SYNONYM_NAME
        "#,
        types = TARGET_TYPES,
        created = iso_timestamp("o.CREATED"),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut synonyms = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("OWNER", PURPOSE)?;
        let db_link = row.text("DB_LINK", PURPOSE)?;
        synonyms.push(Synonym {
            name: row.required_text("NAME", PURPOSE)?,
            is_public: owner == "PUBLIC",
            owner: Some(owner),
            target_object: target_object(
                row.required_text("TARGET_OBJECT", PURPOSE)?,
                db_link.as_deref(),
            ),
            target_owner: non_empty(row.text("TARGET_OWNER", PURPOSE)?),
            target_type: row.text("TARGET_TYPE", PURPOSE)?,
            comment: None,
            created_at: row.text("CREATED_AT", PURPOSE)?,
        });
    }
    Ok(synonyms)
}
