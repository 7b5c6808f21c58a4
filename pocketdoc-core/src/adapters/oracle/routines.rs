//! Oracle procedure and function collection.
//!
//! Standalone routines and public package members both come from
//! `ALL_PROCEDURES`; a package member is named `PACKAGE.MEMBER` and each
//! overload is reported separately. Arguments come from top-level
//! `ALL_ARGUMENTS` rows. Position 0 is a function's return value, which is
//! also how a packaged member is told apart from a procedure.

use super::connection::{CatalogRow, iso_timestamp};
use super::{OracleAdapter, SCOPE};
use crate::adapters::signature::build_signature;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

/// Identity of one (possibly overloaded) subprogram in `ALL_ARGUMENTS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct SubprogramKey {
    pub owner: String,
    pub package: Option<String>,
    pub name: String,
    pub overload: Option<String>,
}

/// Ordered arguments and the resolved return type of one subprogram.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct Parameters {
    pub arguments: Vec<RoutineArgument>,
    pub return_type: Option<String>,
}

/// Display name of a routine: `PACKAGE.MEMBER` for package members.
pub(super) fn qualified_name(package: Option<&str>, member: &str) -> String {
    match package {
        Some(package) => format!("{}.{}", package, member),
        None => member.to_string(),
    }
}

/// Maps `ALL_PROCEDURES.AUTHID` to the model's security type.
pub(super) fn security_type(authid: Option<&str>) -> Option<String> {
    match authid.map(str::trim) {
        Some("CURRENT_USER") => Some("INVOKER".to_string()),
        Some("DEFINER") => Some("DEFINER".to_string()),
        _ => None,
    }
}

pub(crate) async fn collect_routines(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Routine>> {
    const PURPOSE: &str = "routines";
    let filter = adapter.config.schema_filter.clause("p.OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            p.OWNER,
            p.OBJECT_NAME,
            p.PROCEDURE_NAME,
            p.OBJECT_TYPE,
            p.OVERLOAD,
            p.DETERMINISTIC,
            p.AUTHID,
            {created} AS CREATED_AT,
            {modified} AS MODIFIED_AT
        FROM ALL_PROCEDURES p
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = p.OWNER
              AND o.OBJECT_NAME = p.OBJECT_NAME
              AND o.OBJECT_TYPE = p.OBJECT_TYPE
        WHERE ((p.OBJECT_TYPE IN ('PROCEDURE', 'FUNCTION') AND p.PROCEDURE_NAME IS NULL)
            OR (p.OBJECT_TYPE = 'PACKAGE' AND p.PROCEDURE_NAME IS NOT NULL))
          AND {filter}
        ORDER BY p.OWNER, p.OBJECT_NAME, p.PROCEDURE_NAME, p.SUBPROGRAM_ID
        "#,
        created = iso_timestamp("o.CREATED"),
        modified = iso_timestamp("o.LAST_DDL_TIME"),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;
    let mut parameters = fetch_arguments(adapter, ctx).await?;

    let mut routines = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("OWNER", PURPOSE)?;
        let object_name = row.required_text("OBJECT_NAME", PURPOSE)?;
        let object_type = row.required_text("OBJECT_TYPE", PURPOSE)?;

        // Packages list members in PROCEDURE_NAME; standalone rows leave it NULL
        let (package, member) = match row.text("PROCEDURE_NAME", PURPOSE)? {
            Some(member) => (Some(object_name), member),
            None => (None, object_name),
        };
        let key = SubprogramKey {
            owner: owner.clone(),
            package: package.clone(),
            name: member.clone(),
            overload: row.text("OVERLOAD", PURPOSE)?,
        };
        let Parameters {
            arguments,
            return_type,
        } = parameters.remove(&key).unwrap_or_default();

        let routine_type = match object_type.as_str() {
            "PROCEDURE" => RoutineType::Procedure,
            "FUNCTION" => RoutineType::Function,
            _ if return_type.is_some() => RoutineType::Function,
            _ => RoutineType::Procedure,
        };
        let return_type = match routine_type {
            RoutineType::Function => return_type,
            RoutineType::Procedure => None,
        };
        let name = qualified_name(package.as_deref(), &member);

        tracing::debug!("Collected {} {}.{}", routine_type, owner, name);
        routines.push(Routine {
            signature: build_signature(routine_type, &name, &arguments, return_type.as_deref()),
            name,
            owner: Some(owner),
            routine_type,
            comment: None,
            arguments,
            return_type,
            language: Some("PL/SQL".to_string()),
            is_deterministic: row.yes("DETERMINISTIC", PURPOSE)?,
            security_type: security_type(row.text("AUTHID", PURPOSE)?.as_deref()),
            created_at: row.text("CREATED_AT", PURPOSE)?,
            modified_at: row.text("MODIFIED_AT", PURPOSE)?,
        });
    }
    Ok(routines)
}

/// Top-level arguments of every subprogram in scope.
///
/// Procedures without parameters have a single placeholder row with no
/// name and no type; it is skipped.
async fn fetch_arguments(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<SubprogramKey, Parameters>> {
    const PURPOSE: &str = "routine arguments";
    let filter = adapter.config.schema_filter.clause("a.OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            a.OWNER,
            a.PACKAGE_NAME,
            a.OBJECT_NAME,
            a.OVERLOAD,
            a.ARGUMENT_NAME,
            a.POSITION,
            a.IN_OUT,
            CASE
                WHEN a.TYPE_NAME IS NOT NULL AND a.TYPE_SUBNAME IS NOT NULL
                    THEN a.TYPE_NAME || '.' || a.TYPE_SUBNAME
                WHEN a.TYPE_NAME IS NOT NULL THEN a.TYPE_NAME
                ELSE a.DATA_TYPE
            END AS DATA_TYPE
        FROM ALL_ARGUMENTS a
        WHERE a.DATA_LEVEL = 0
          AND a.DATA_TYPE IS NOT NULL
          AND (a.ARGUMENT_NAME IS NOT NULL OR a.POSITION = 0)
          AND {filter}
        ORDER BY a.OWNER, a.PACKAGE_NAME, a.OBJECT_NAME, a.OVERLOAD, a.POSITION
        "#,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut grouped: HashMap<SubprogramKey, Parameters> = HashMap::new();
    for row in &rows {
        let (key, position) = argument_key(row, PURPOSE)?;
        let entry = grouped.entry(key).or_default();
        let data_type = row.required_text("DATA_TYPE", PURPOSE)?;
        if position == 0 {
            entry.return_type = Some(data_type);
            continue;
        }
        entry.arguments.push(RoutineArgument {
            name: row.text("ARGUMENT_NAME", PURPOSE)?.unwrap_or_default(),
            position: i32::try_from(position).unwrap_or(i32::MAX),
            mode: ArgumentMode::from_catalog(
                row.text("IN_OUT", PURPOSE)?.as_deref().unwrap_or("IN"),
            ),
            data_type,
            default_value: None,
            comment: None,
        });
    }
    Ok(grouped)
}

fn argument_key(row: &CatalogRow, purpose: &str) -> Result<(SubprogramKey, i64)> {
    Ok((
        SubprogramKey {
            owner: row.required_text("OWNER", purpose)?,
            package: row.text("PACKAGE_NAME", purpose)?,
            name: row.required_text("OBJECT_NAME", purpose)?,
            overload: row.text("OVERLOAD", purpose)?,
        },
        row.required_int("POSITION", purpose)?,
    ))
}
