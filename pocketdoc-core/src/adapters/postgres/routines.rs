//! PostgreSQL function and procedure collection.
//!
//! Signatures are rebuilt from `pg_proc` argument arrays
//! (`proargnames`, `proargmodes`, and the formatted argument types). The
//! routine source (`prosrc`) is never selected.
//!
//! # Argument modes
//! - `i` IN, `v` VARIADIC (reported as IN)
//! - `o` OUT, `t` TABLE column (reported as OUT)
//! - `b` INOUT

use super::{PostgresAdapter, SCOPE};
use crate::adapters::helpers::RowExt;
use crate::adapters::signature::build_signature;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;

pub(crate) async fn collect_routines(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Routine>> {
    const PURPOSE: &str = "routines";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            p.proname::text AS name,
            CASE p.prokind WHEN 'p' THEN 'PROCEDURE' ELSE 'FUNCTION' END AS routine_type,
            obj_description(p.oid, 'pg_proc')::text AS comment,
            CASE WHEN p.prokind = 'p' THEN NULL
                 ELSE (CASE WHEN p.proretset THEN 'SETOF ' ELSE '' END)
                      || format_type(p.prorettype, NULL) END AS return_type,
            l.lanname::text AS language,
            p.provolatile = 'i' AS is_deterministic,
            p.prosecdef AS security_definer,
            COALESCE(p.proargnames, ARRAY[]::text[]) AS arg_names,
            COALESCE(p.proargmodes::text[], ARRAY[]::text[]) AS arg_modes,
            ARRAY(
                SELECT format_type(u.type_oid, NULL)
                FROM unnest(COALESCE(p.proallargtypes, p.proargtypes::oid[]))
                     WITH ORDINALITY AS u(type_oid, ord)
                ORDER BY u.ord
            )::text[] AS arg_types
        FROM pg_catalog.pg_proc p
        JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
        JOIN pg_catalog.pg_language l ON l.oid = p.prolang
        WHERE p.prokind IN ('f', 'p')
          AND {}
        ORDER BY n.nspname, p.proname, p.oid
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut routines = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.required("name", PURPOSE)?;
        let routine_type = match row.required::<String>("routine_type", PURPOSE)?.as_str() {
            "PROCEDURE" => RoutineType::Procedure,
            _ => RoutineType::Function,
        };
        let return_type: Option<String> = non_empty(row.field("return_type", PURPOSE)?);
        let arguments = decode_arguments(
            &row.required::<Vec<String>>("arg_names", PURPOSE)?,
            &row.required::<Vec<String>>("arg_modes", PURPOSE)?,
            &row.required::<Vec<String>>("arg_types", PURPOSE)?,
        );
        let security_definer: bool = row.required("security_definer", PURPOSE)?;

        tracing::debug!("Collected {} {}", routine_type, name);
        routines.push(Routine {
            signature: build_signature(routine_type, &name, &arguments, return_type.as_deref()),
            name,
            owner: Some(row.required("owner", PURPOSE)?),
            routine_type,
            comment: non_empty(row.field("comment", PURPOSE)?),
            arguments,
            return_type,
            language: non_empty(row.field("language", PURPOSE)?).map(|l| l.to_uppercase()),
            is_deterministic: row.required("is_deterministic", PURPOSE)?,
            security_type: Some(if security_definer { "DEFINER" } else { "INVOKER" }.to_string()),
            created_at: None,
            modified_at: None,
        });
    }
    Ok(routines)
}

/// Zips `pg_proc` argument arrays into ordered arguments.
///
/// `types` drives the count; missing names or modes default to empty and
/// `IN`.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::postgres::decode_arguments;
/// use pocketdoc_core::models::ArgumentMode;
///
/// let args = decode_arguments(
///     &["id".to_string(), "total".to_string()],
///     &["i".to_string(), "o".to_string()],
///     &["integer".to_string(), "numeric".to_string()],
/// );
/// assert_eq!(args[1].mode, ArgumentMode::Out);
/// assert_eq!(args[1].position, 2);
/// ```
pub fn decode_arguments(names: &[String], modes: &[String], types: &[String]) -> Vec<RoutineArgument> {
    types
        .iter()
        .enumerate()
        .map(|(i, data_type)| RoutineArgument {
            name: names.get(i).cloned().unwrap_or_default(),
            position: i32::try_from(i + 1).unwrap_or(i32::MAX),
            mode: modes.get(i).map_or(ArgumentMode::In, |m| parse_mode(m)),
            data_type: data_type.clone(),
            default_value: None,
            comment: None,
        })
        .collect()
}

fn parse_mode(mode: &str) -> ArgumentMode {
    match mode {
        "o" | "t" => ArgumentMode::Out,
        "b" => ArgumentMode::InOut,
        _ => ArgumentMode::In,
    }
}
