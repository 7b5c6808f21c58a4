//! SQL Server synonym collection.
//!
//! `base_object_name` is a one- to four-part name such as
//! `[srv].[db].[dbo].[Orders]`; the target owner and object are its last
//! two parts. The target type is resolved through `OBJECT_ID`, so targets
//! in other databases or on linked servers have no type.

use super::connection::{TdsRowExt, description_join, iso_timestamp};
use super::{SCOPE, SqlServerAdapter};
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

/// Splits a synonym base object name into `(owner, object)`.
///
/// Bracket quoting is removed and a `.` inside brackets is kept as part of
/// the identifier.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::mssql::split_base_object;
///
/// assert_eq!(
///     split_base_object("[Sales].[dbo].[Orders]"),
///     (Some("dbo".to_string()), "Orders".to_string())
/// );
/// assert_eq!(split_base_object("Orders"), (None, "Orders".to_string()));
/// ```
pub fn split_base_object(base_object_name: &str) -> (Option<String>, String) {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = base_object_name.trim().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '[' if !quoted => quoted = true,
            ']' if quoted => {
                // `]]` escapes a literal bracket inside a quoted name
                if chars.peek() == Some(&']') {
                    chars.next();
                    current.push(']');
                } else {
                    quoted = false;
                }
            }
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    let object = parts.pop().unwrap_or_default();
    let owner = parts.pop().filter(|owner| !owner.is_empty());
    (owner, object)
}

/// Maps a `sys.objects.type` code to a synonym target type.
pub(super) fn target_type(object_type: &str) -> Option<&'static str> {
    match object_type.trim() {
        "U" => Some("TABLE"),
        "V" => Some("VIEW"),
        "P" | "PC" | "X" => Some("PROCEDURE"),
        "FN" | "IF" | "TF" | "FS" | "FT" | "AF" => Some("FUNCTION"),
        "SO" => Some("SEQUENCE"),
        "SN" => Some("SYNONYM"),
        _ => None,
    }
}

pub(crate) async fn collect_synonyms(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Synonym>> {
    const PURPOSE: &str = "synonyms";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            syn.name AS name,
            CAST(syn.base_object_name AS NVARCHAR(1035)) AS base_object_name,
            CAST(target.type AS NVARCHAR(2)) AS target_object_type,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            {created} AS created_at
        FROM sys.synonyms syn
        JOIN sys.schemas s ON s.schema_id = syn.schema_id
        LEFT JOIN sys.objects target
               ON target.object_id = OBJECT_ID(syn.base_object_name)
              AND PARSENAME(syn.base_object_name, 4) IS NULL
              AND COALESCE(PARSENAME(syn.base_object_name, 3), DB_NAME()) = DB_NAME()
        {description}
        WHERE {filter}
        ORDER BY s.name, syn.name
        "#,
        created = iso_timestamp("syn.create_date"),
        description = description_join("ep", "syn.object_id", "0", 1),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut synonyms = Vec::with_capacity(rows.len());
    for row in &rows {
        let (target_owner, target_object) =
            split_base_object(&row.required_text("base_object_name", PURPOSE)?);
        synonyms.push(Synonym {
            name: row.required_text("name", PURPOSE)?,
            owner: Some(row.required_text("owner", PURPOSE)?),
            target_object,
            target_owner,
            target_type: row
                .text("target_object_type", PURPOSE)?
                .as_deref()
                .and_then(target_type)
                .map(str::to_string),
            is_public: false,
            comment: non_empty(row.text("comment", PURPOSE)?),
            created_at: row.text("created_at", PURPOSE)?,
        });
    }
    Ok(synonyms)
}
