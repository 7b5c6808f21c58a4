//! MySQL stored procedure and function collection.
//!
//! Routines come from `INFORMATION_SCHEMA.ROUTINES`, their arguments from
//! `PARAMETERS`. The `ORDINAL_POSITION = 0` parameter row describes a
//! function's return value and is skipped; `DTD_IDENTIFIER` on the routine
//! row carries the same type. `ROUTINE_DEFINITION` is never selected.

use super::{MySqlAdapter, SCOPE, TIMESTAMP_FORMAT};
use crate::adapters::helpers::RowExt;
use crate::adapters::signature::build_signature;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

/// A procedure and a function may share a name within one schema.
type RoutineKey = (String, RoutineType, String);

pub(super) fn routine_type(value: &str) -> RoutineType {
    if value.eq_ignore_ascii_case("FUNCTION") {
        RoutineType::Function
    } else {
        RoutineType::Procedure
    }
}

pub(crate) async fn collect_routines(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Routine>> {
    const PURPOSE: &str = "routines";
    let filter = adapter.config.schema_filter.clause("r.ROUTINE_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(r.ROUTINE_SCHEMA AS CHAR) AS owner,
            CAST(r.ROUTINE_NAME AS CHAR) AS name,
            CAST(r.ROUTINE_TYPE AS CHAR) AS routine_type,
            CAST(r.ROUTINE_COMMENT AS CHAR) AS comment,
            CAST(r.DTD_IDENTIFIER AS CHAR) AS return_type,
            CAST(r.IS_DETERMINISTIC AS CHAR) AS is_deterministic,
            CAST(r.SECURITY_TYPE AS CHAR) AS security_type,
            CAST(DATE_FORMAT(r.CREATED, '{ts}') AS CHAR) AS created_at,
            CAST(DATE_FORMAT(r.LAST_ALTERED, '{ts}') AS CHAR) AS modified_at
        FROM INFORMATION_SCHEMA.ROUTINES r
        WHERE r.ROUTINE_TYPE IN ('PROCEDURE', 'FUNCTION')
          AND {filter}
        ORDER BY r.ROUTINE_SCHEMA, r.ROUTINE_NAME, r.ROUTINE_TYPE
        "#,
        ts = TIMESTAMP_FORMAT,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;
    let mut arguments = fetch_arguments(adapter, ctx).await?;

    let mut routines = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner: String = row.required("owner", PURPOSE)?;
        let name: String = row.required("name", PURPOSE)?;
        let routine_type = routine_type(&row.required::<String>("routine_type", PURPOSE)?);
        let return_type = match routine_type {
            RoutineType::Function => non_empty(row.field("return_type", PURPOSE)?),
            RoutineType::Procedure => None,
        };
        let routine_arguments = arguments
            .remove(&(owner.clone(), routine_type, name.clone()))
            .unwrap_or_default();
        let deterministic: String = row.required("is_deterministic", PURPOSE)?;

        tracing::debug!("Collected {} {}.{}", routine_type, owner, name);
        routines.push(Routine {
            signature: build_signature(
                routine_type,
                &name,
                &routine_arguments,
                return_type.as_deref(),
            ),
            name,
            owner: Some(owner),
            routine_type,
            comment: non_empty(row.field("comment", PURPOSE)?),
            arguments: routine_arguments,
            return_type,
            language: Some("SQL".to_string()),
            is_deterministic: deterministic.eq_ignore_ascii_case("YES"),
            security_type: non_empty(row.field("security_type", PURPOSE)?),
            created_at: row.field("created_at", PURPOSE)?,
            modified_at: row.field("modified_at", PURPOSE)?,
        });
    }
    Ok(routines)
}

/// Declared parameters of every routine in scope, ordered by position.
async fn fetch_arguments(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<RoutineKey, Vec<RoutineArgument>>> {
    const PURPOSE: &str = "routine arguments";
    let filter = adapter.config.schema_filter.clause("p.SPECIFIC_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(p.SPECIFIC_SCHEMA AS CHAR) AS owner,
            CAST(p.SPECIFIC_NAME AS CHAR) AS routine_name,
            CAST(p.ROUTINE_TYPE AS CHAR) AS routine_type,
            CAST(p.PARAMETER_NAME AS CHAR) AS name,
            CAST(p.ORDINAL_POSITION AS SIGNED) AS ordinal,
            CAST(p.PARAMETER_MODE AS CHAR) AS mode,
            CAST(p.DTD_IDENTIFIER AS CHAR) AS data_type
        FROM INFORMATION_SCHEMA.PARAMETERS p
        WHERE p.ORDINAL_POSITION > 0
          AND {}
        ORDER BY p.SPECIFIC_SCHEMA, p.SPECIFIC_NAME, p.ORDINAL_POSITION
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut grouped: HashMap<RoutineKey, Vec<RoutineArgument>> = HashMap::new();
    for row in &rows {
        let key = (
            row.required::<String>("owner", PURPOSE)?,
            routine_type(&row.required::<String>("routine_type", PURPOSE)?),
            row.required::<String>("routine_name", PURPOSE)?,
        );
        let ordinal: i64 = row.required("ordinal", PURPOSE)?;
        let mode: Option<String> = row.field("mode", PURPOSE)?;
        grouped.entry(key).or_default().push(RoutineArgument {
            name: row.field::<Option<String>>("name", PURPOSE)?.unwrap_or_default(),
            position: i32::try_from(ordinal).unwrap_or(i32::MAX),
            mode: mode.as_deref().map_or(ArgumentMode::In, ArgumentMode::from_catalog),
            data_type: row.required("data_type", PURPOSE)?,
            default_value: None,
            comment: None,
        });
    }
    Ok(grouped)
}
