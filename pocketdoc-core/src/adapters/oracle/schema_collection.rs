//! Oracle table, column, constraint and index collection from the `ALL_*`
//! dictionary views.

use super::connection::iso_timestamp;
use super::{OracleAdapter, SCOPE};
use crate::adapters::constraints::{
    ConstraintRow, ConstraintSet, IndexBuilder, TableKey, group_by_table,
};
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

pub(crate) async fn database_info(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<DatabaseInfo> {
    const PURPOSE: &str = "database name and version";
    let rows = adapter
        .fetch_rows(
            ctx,
            PURPOSE,
            "SELECT SYS_CONTEXT('USERENV', 'DB_NAME') AS NAME, \
             (SELECT BANNER FROM V$VERSION WHERE ROWNUM = 1) AS VERSION FROM DUAL",
            &[],
        )
        .await?;
    let row = rows
        .first()
        .ok_or_else(|| PocketDocError::unexpected_null("VERSION", PURPOSE))?;
    Ok(DatabaseInfo {
        name: row.required_text("NAME", PURPOSE)?,
        version: row.required_text("VERSION", PURPOSE)?,
    })
}

/// Relational tables, excluding nested tables, IOT overflow segments,
/// recycle-bin entries and materialized view containers.
pub(crate) async fn collect_tables(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Table>> {
    const PURPOSE: &str = "tables";
    let filter = adapter.config.schema_filter.clause("t.OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            t.OWNER,
            t.TABLE_NAME AS NAME,
            CASE
                WHEN t.TEMPORARY = 'Y' THEN 'TEMPORARY'
                WHEN t.PARTITIONED = 'YES' THEN 'PARTITIONED'
                ELSE 'TABLE'
            END AS TABLE_TYPE,
            tc.COMMENTS AS TABLE_COMMENT,
            t.NUM_ROWS AS ROW_COUNT,
            {created} AS CREATED_AT,
            {modified} AS MODIFIED_AT
        FROM ALL_TABLES t
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = t.OWNER
              AND o.OBJECT_NAME = t.TABLE_NAME
              AND o.OBJECT_TYPE = 'TABLE'
        LEFT JOIN ALL_TAB_COMMENTS tc
               ON tc.OWNER = t.OWNER
              AND tc.TABLE_NAME = t.TABLE_NAME
        WHERE t.NESTED = 'NO'
          AND t.SECONDARY = 'N'
          AND t.DROPPED = 'NO'
          AND (t.IOT_TYPE IS NULL OR t.IOT_TYPE = 'IOT')
          AND NOT EXISTS (
              SELECT 1 FROM ALL_MVIEWS mv
              WHERE mv.OWNER = t.OWNER AND mv.MVIEW_NAME = t.TABLE_NAME
          )
          AND {filter}
        ORDER BY t.OWNER, t.TABLE_NAME
        "#,
        created = iso_timestamp("o.CREATED"),
        modified = iso_timestamp("o.LAST_DDL_TIME"),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut columns = fetch_columns(adapter, ctx, "TABLE").await?;
    let constraints = fetch_constraints(adapter, ctx).await?;
    let mut indexes = fetch_indexes(adapter, ctx).await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("OWNER", PURPOSE)?;
        let name = row.required_text("NAME", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());

        let mut table_columns = columns.remove(&key).unwrap_or_default();
        if let Some(rows) = constraints.get(&key) {
            ConstraintSet::from_rows(rows.iter().cloned()).apply(&mut table_columns);
        }

        tracing::debug!("Collected table {} with {} columns", key, table_columns.len());
        tables.push(Table {
            name,
            owner: Some(owner),
            table_type: row.required_text("TABLE_TYPE", PURPOSE)?,
            comment: non_empty(row.text("TABLE_COMMENT", PURPOSE)?),
            columns: table_columns,
            indexes: indexes.remove(&key).unwrap_or_default(),
            row_count: row.int("ROW_COUNT", PURPOSE)?,
            created_at: row.text("CREATED_AT", PURPOSE)?,
            modified_at: row.text("MODIFIED_AT", PURPOSE)?,
        });
    }
    Ok(tables)
}

/// Columns of every object whose `ALL_OBJECTS.OBJECT_TYPE` is
/// `object_type`, grouped per object and ordered by `COLUMN_ID`.
///
/// Character columns report their length in characters; hidden and
/// virtual system columns are skipped.
pub(crate) async fn fetch_columns(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
    object_type: &str,
) -> Result<HashMap<TableKey, Vec<Column>>> {
    const PURPOSE: &str = "columns";
    let filter = adapter.config.schema_filter.clause("c.OWNER", &SCOPE, 2);
    let query = format!(
        r#"
        SELECT
            c.OWNER,
            c.TABLE_NAME,
            c.COLUMN_NAME AS NAME,
            c.COLUMN_ID AS ORDINAL,
            c.DATA_TYPE,
            CASE WHEN c.CHAR_USED IS NOT NULL THEN c.CHAR_LENGTH END AS CHAR_LENGTH,
            c.DATA_PRECISION AS NUM_PRECISION,
            c.DATA_SCALE AS NUM_SCALE,
            c.NULLABLE,
            c.DATA_DEFAULT AS DEFAULT_VALUE,
            cc.COMMENTS AS COLUMN_COMMENT,
            c.IDENTITY_COLUMN
        FROM ALL_TAB_COLUMNS c
        JOIN ALL_OBJECTS o
          ON o.OWNER = c.OWNER
         AND o.OBJECT_NAME = c.TABLE_NAME
         AND o.OBJECT_TYPE = :1
        LEFT JOIN ALL_COL_COMMENTS cc
               ON cc.OWNER = c.OWNER
              AND cc.TABLE_NAME = c.TABLE_NAME
              AND cc.COLUMN_NAME = c.COLUMN_NAME
        WHERE c.COLUMN_ID IS NOT NULL
          AND {filter}
        ORDER BY c.OWNER, c.TABLE_NAME, c.COLUMN_ID
        "#,
        filter = filter.sql
    );
    let mut binds = Vec::with_capacity(filter.binds.len() + 1);
    binds.push(object_type.to_string());
    binds.extend(filter.binds);
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required_text("OWNER", PURPOSE)?,
            row.required_text("TABLE_NAME", PURPOSE)?,
        );
        let ordinal = row.required_int("ORDINAL", PURPOSE)?;
        keyed.push((
            key,
            Column {
                name: row.required_text("NAME", PURPOSE)?,
                position: i32::try_from(ordinal).unwrap_or(i32::MAX),
                data_type: row.required_text("DATA_TYPE", PURPOSE)?,
                length: positive(row.int("CHAR_LENGTH", PURPOSE)?),
                precision: positive(row.int("NUM_PRECISION", PURPOSE)?),
                scale: row.int("NUM_SCALE", PURPOSE)?,
                nullable: row.yes("NULLABLE", PURPOSE)?,
                default_value: non_empty(row.text("DEFAULT_VALUE", PURPOSE)?),
                comment: non_empty(row.text("COLUMN_COMMENT", PURPOSE)?),
                is_auto_increment: row.yes("IDENTITY_COLUMN", PURPOSE)?,
                ..Default::default()
            },
        ));
    }
    Ok(group_by_table(keyed))
}

/// Primary-key, unique and foreign-key column rows in constraint order.
///
/// Foreign-key columns are paired with the referenced key's columns by
/// `POSITION`. Disabled constraints are still reported.
async fn fetch_constraints(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<ConstraintRow>>> {
    const PURPOSE: &str = "table constraints";
    let filter = adapter.config.schema_filter.clause("c.OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            c.OWNER,
            c.TABLE_NAME,
            c.CONSTRAINT_NAME,
            c.CONSTRAINT_TYPE AS KIND,
            cc.COLUMN_NAME,
            rc.OWNER AS REF_OWNER,
            rc.TABLE_NAME AS REF_TABLE,
            rcc.COLUMN_NAME AS REF_COLUMN
        FROM ALL_CONSTRAINTS c
        JOIN ALL_CONS_COLUMNS cc
          ON cc.OWNER = c.OWNER
         AND cc.CONSTRAINT_NAME = c.CONSTRAINT_NAME
         AND cc.TABLE_NAME = c.TABLE_NAME
        LEFT JOIN ALL_CONSTRAINTS rc
               ON c.CONSTRAINT_TYPE = 'R'
              AND rc.OWNER = c.R_OWNER
              AND rc.CONSTRAINT_NAME = c.R_CONSTRAINT_NAME
        LEFT JOIN ALL_CONS_COLUMNS rcc
               ON rcc.OWNER = rc.OWNER
              AND rcc.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
              AND rcc.POSITION = cc.POSITION
        WHERE c.CONSTRAINT_TYPE IN ('P', 'U', 'R')
          AND {filter}
        ORDER BY c.OWNER, c.TABLE_NAME, c.CONSTRAINT_NAME, cc.POSITION
        "#,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required_text("OWNER", PURPOSE)?,
            row.required_text("TABLE_NAME", PURPOSE)?,
        );
        let column = row.required_text("COLUMN_NAME", PURPOSE)?;
        let kind = row.required_text("KIND", PURPOSE)?;
        let constraint = match kind.as_str() {
            "P" => ConstraintRow::primary_key(column),
            "U" => ConstraintRow::unique(column),
            "R" => {
                let table = match (
                    row.text("REF_OWNER", PURPOSE)?,
                    row.text("REF_TABLE", PURPOSE)?,
                ) {
                    (Some(owner), Some(table)) => format!("{}.{}", owner, table),
                    (_, table) => table.unwrap_or_default(),
                };
                ConstraintRow::foreign_key(
                    column,
                    table,
                    row.text("REF_COLUMN", PURPOSE)?.unwrap_or_default(),
                )
            }
            other => return Err(PocketDocError::unexpected_value("KIND", PURPOSE, other)),
        };
        keyed.push((key, constraint));
    }
    Ok(group_by_table(keyed))
}

/// Indexes of tables in scope, columns ordered by `COLUMN_POSITION`.
///
/// Function-based keys surface as hidden `SYS_NC...$` columns and are
/// reported as `<expression>`. `UNUSABLE` indexes are disabled; LOB
/// indexes are skipped.
async fn fetch_indexes(
    adapter: &OracleAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<Index>>> {
    const PURPOSE: &str = "indexes";
    let filter = adapter.config.schema_filter.clause("i.TABLE_OWNER", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            i.TABLE_OWNER AS OWNER,
            i.TABLE_NAME,
            i.INDEX_NAME,
            i.INDEX_TYPE,
            i.UNIQUENESS,
            CASE WHEN EXISTS (
                SELECT 1 FROM ALL_CONSTRAINTS pk
                WHERE pk.OWNER = i.TABLE_OWNER
                  AND pk.TABLE_NAME = i.TABLE_NAME
                  AND pk.CONSTRAINT_TYPE = 'P'
                  AND pk.INDEX_OWNER = i.OWNER
                  AND pk.INDEX_NAME = i.INDEX_NAME
            ) THEN 'Y' ELSE 'N' END AS IS_PRIMARY,
            i.STATUS,
            CASE WHEN ic.COLUMN_NAME LIKE 'SYS\_NC%$' ESCAPE '\'
                 THEN '<expression>' ELSE ic.COLUMN_NAME END AS COLUMN_NAME,
            ic.COLUMN_POSITION AS KEY_POSITION,
            {created} AS CREATED_AT
        FROM ALL_INDEXES i
        JOIN ALL_IND_COLUMNS ic
          ON ic.INDEX_OWNER = i.OWNER
         AND ic.INDEX_NAME = i.INDEX_NAME
        LEFT JOIN ALL_OBJECTS o
               ON o.OWNER = i.OWNER
              AND o.OBJECT_NAME = i.INDEX_NAME
              AND o.OBJECT_TYPE = 'INDEX'
        WHERE i.INDEX_TYPE <> 'LOB'
          AND i.TABLE_TYPE = 'TABLE'
          AND {filter}
        ORDER BY i.TABLE_OWNER, i.TABLE_NAME, i.INDEX_NAME, ic.COLUMN_POSITION
        "#,
        created = iso_timestamp("o.CREATED"),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut builder = IndexBuilder::new();
    for row in &rows {
        let owner = row.required_text("OWNER", PURPOSE)?;
        let table_name = row.required_text("TABLE_NAME", PURPOSE)?;
        let header = Index {
            name: row.required_text("INDEX_NAME", PURPOSE)?,
            table_name: table_name.clone(),
            owner: Some(owner.clone()),
            index_type: row.required_text("INDEX_TYPE", PURPOSE)?,
            columns: Vec::new(),
            is_unique: row.text("UNIQUENESS", PURPOSE)?.as_deref() == Some("UNIQUE"),
            is_primary: row.yes("IS_PRIMARY", PURPOSE)?,
            is_enabled: row.text("STATUS", PURPOSE)?.as_deref() != Some("UNUSABLE"),
            comment: None,
            created_at: row.text("CREATED_AT", PURPOSE)?,
        };
        builder.push(
            TableKey::new(owner, table_name),
            header,
            row.required_text("COLUMN_NAME", PURPOSE)?,
            row.required_int("KEY_POSITION", PURPOSE)?,
        );
    }
    Ok(builder.finish())
}
