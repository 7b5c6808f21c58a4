//! SQL Server procedure and function collection.
//!
//! Covers T-SQL and CLR procedures (`P`, `PC`), scalar functions (`FN`,
//! `FS`) and table-valued functions (`IF`, `TF`, `FT`). A scalar function's
//! return type is its `parameter_id = 0` row; table-valued functions return
//! `TABLE`. From `sys.sql_modules` only `execute_as_principal_id` is read.

use super::connection::{TdsRowExt, description_join, iso_timestamp};
use super::{SCOPE, SqlServerAdapter};
use crate::adapters::constraints::{TableKey, group_by_table};
use crate::adapters::signature::build_signature;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

const ROUTINE_TYPES: &str = "'P', 'PC', 'FN', 'IF', 'TF', 'FS', 'FT'";

/// Maps a `sys.objects.type` code to the routine kind and its language.
pub(super) fn classify(object_type: &str) -> (RoutineType, &'static str) {
    match object_type.trim() {
        "P" => (RoutineType::Procedure, "T-SQL"),
        "PC" => (RoutineType::Procedure, "CLR"),
        "FS" | "FT" => (RoutineType::Function, "CLR"),
        _ => (RoutineType::Function, "T-SQL"),
    }
}

pub(crate) async fn collect_routines(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Routine>> {
    const PURPOSE: &str = "routines";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            o.name AS name,
            CAST(o.type AS NVARCHAR(2)) AS object_type,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            CAST(CASE
                WHEN o.type IN ('IF', 'TF', 'FT') THEN 'TABLE'
                ELSE (SELECT TYPE_NAME(p.user_type_id) FROM sys.parameters p
                      WHERE p.object_id = o.object_id AND p.parameter_id = 0)
            END AS NVARCHAR(128)) AS return_type,
            CAST(OBJECTPROPERTY(o.object_id, 'IsDeterministic') AS BIGINT) AS is_deterministic,
            CAST(CASE WHEN COALESCE(m.execute_as_principal_id, am.execute_as_principal_id) IS NULL
                      THEN 'INVOKER' ELSE 'DEFINER' END AS NVARCHAR(7)) AS security_type,
            {created} AS created_at,
            {modified} AS modified_at
        FROM sys.objects o
        JOIN sys.schemas s ON s.schema_id = o.schema_id
        LEFT JOIN sys.sql_modules m ON m.object_id = o.object_id
        LEFT JOIN sys.assembly_modules am ON am.object_id = o.object_id
        {description}
        WHERE o.type IN ({types})
          AND o.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, o.name
        "#,
        created = iso_timestamp("o.create_date"),
        modified = iso_timestamp("o.modify_date"),
        description = description_join("ep", "o.object_id", "0", 1),
        types = ROUTINE_TYPES,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;
    let mut arguments = fetch_arguments(adapter, ctx).await?;

    let mut routines = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("owner", PURPOSE)?;
        let name = row.required_text("name", PURPOSE)?;
        let (routine_type, language) = classify(&row.required_text("object_type", PURPOSE)?);
        let return_type = match routine_type {
            RoutineType::Function => non_empty(row.text("return_type", PURPOSE)?),
            RoutineType::Procedure => None,
        };
        let routine_arguments = arguments
            .remove(&TableKey::new(owner.clone(), name.clone()))
            .unwrap_or_default();

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
            comment: non_empty(row.text("comment", PURPOSE)?),
            arguments: routine_arguments,
            return_type,
            language: Some(language.to_string()),
            is_deterministic: row.int("is_deterministic", PURPOSE)? == Some(1),
            security_type: row.text("security_type", PURPOSE)?,
            created_at: row.text("created_at", PURPOSE)?,
            modified_at: row.text("modified_at", PURPOSE)?,
        });
    }
    Ok(routines)
}

/// Declared parameters, keyed by routine. `OUTPUT` parameters are `OUT`.
async fn fetch_arguments(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<RoutineArgument>>> {
    const PURPOSE: &str = "routine arguments";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            o.name AS routine_name,
            p.name AS name,
            CAST(p.parameter_id AS BIGINT) AS ordinal,
            p.is_output AS is_output,
            CAST(TYPE_NAME(p.user_type_id) AS NVARCHAR(128)) AS data_type
        FROM sys.parameters p
        JOIN sys.objects o ON o.object_id = p.object_id
        JOIN sys.schemas s ON s.schema_id = o.schema_id
        WHERE p.parameter_id > 0
          AND o.type IN ({types})
          AND o.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, o.name, p.parameter_id
        "#,
        types = ROUTINE_TYPES,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required_text("owner", PURPOSE)?,
            row.required_text("routine_name", PURPOSE)?,
        );
        let ordinal = row.required_int("ordinal", PURPOSE)?;
        let is_output = row.flag("is_output", PURPOSE)?.unwrap_or(false);
        keyed.push((
            key,
            RoutineArgument {
                name: row.text("name", PURPOSE)?.unwrap_or_default(),
                position: i32::try_from(ordinal).unwrap_or(i32::MAX),
                mode: if is_output {
                    ArgumentMode::Out
                } else {
                    ArgumentMode::In
                },
                data_type: row.required_text("data_type", PURPOSE)?,
                default_value: None,
                comment: None,
            },
        ));
    }
    Ok(group_by_table(keyed))
}
