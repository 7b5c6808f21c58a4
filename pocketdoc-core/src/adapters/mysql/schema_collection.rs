//! MySQL table, column, constraint and index collection from
//! `INFORMATION_SCHEMA`.

use super::{MySqlAdapter, SCOPE, TIMESTAMP_FORMAT};
use crate::adapters::constraints::{
    ConstraintRow, ConstraintSet, IndexBuilder, TableKey, group_by_table,
};
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

pub(crate) async fn database_info(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<DatabaseInfo> {
    const PURPOSE: &str = "database name and version";
    let rows = adapter
        .fetch_rows(
            ctx,
            PURPOSE,
            "SELECT CAST(COALESCE(DATABASE(), '') AS CHAR) AS name, CAST(VERSION() AS CHAR) AS version",
            &[],
        )
        .await?;
    let row = rows
        .first()
        .ok_or_else(|| PocketDocError::unexpected_null("version", PURPOSE))?;
    Ok(DatabaseInfo {
        name: row.required("name", PURPOSE)?,
        version: row.required("version", PURPOSE)?,
    })
}

pub(crate) async fn collect_tables(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Table>> {
    const PURPOSE: &str = "tables";
    let filter = adapter.config.schema_filter.clause("t.TABLE_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(t.TABLE_SCHEMA AS CHAR) AS owner,
            CAST(t.TABLE_NAME AS CHAR) AS name,
            CAST(COALESCE(t.ENGINE, 'TABLE') AS CHAR) AS table_type,
            CAST(t.TABLE_COMMENT AS CHAR) AS comment,
            CAST(t.TABLE_ROWS AS SIGNED) AS row_count,
            CAST(DATE_FORMAT(t.CREATE_TIME, '{ts}') AS CHAR) AS created_at,
            CAST(DATE_FORMAT(t.UPDATE_TIME, '{ts}') AS CHAR) AS modified_at
        FROM INFORMATION_SCHEMA.TABLES t
        WHERE t.TABLE_TYPE = 'BASE TABLE'
          AND {filter}
        ORDER BY t.TABLE_SCHEMA, t.TABLE_NAME
        "#,
        ts = TIMESTAMP_FORMAT,
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut columns = fetch_columns(adapter, ctx, "BASE TABLE").await?;
    let constraints = fetch_constraints(adapter, ctx).await?;
    let mut indexes = fetch_indexes(adapter, ctx).await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner: String = row.required("owner", PURPOSE)?;
        let name: String = row.required("name", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());

        let mut table_columns = columns.remove(&key).unwrap_or_default();
        if let Some(rows) = constraints.get(&key) {
            ConstraintSet::from_rows(rows.iter().cloned()).apply(&mut table_columns);
        }

        tracing::debug!("Collected table {} with {} columns", key, table_columns.len());
        tables.push(Table {
            name,
            owner: Some(owner),
            table_type: row.required("table_type", PURPOSE)?,
            comment: non_empty(row.field("comment", PURPOSE)?),
            columns: table_columns,
            indexes: indexes.remove(&key).unwrap_or_default(),
            row_count: row.field("row_count", PURPOSE)?,
            created_at: row.field("created_at", PURPOSE)?,
            modified_at: row.field("modified_at", PURPOSE)?,
        });
    }
    Ok(tables)
}

/// Columns of every relation whose `TABLE_TYPE` is `table_type`, grouped per
/// relation and ordered by ordinal position.
///
/// `COLUMN_KEY` seeds the primary-key and unique flags; the constraint pass
/// for base tables adds foreign keys and multi-column unique keys.
pub(crate) async fn fetch_columns(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
    table_type: &str,
) -> Result<HashMap<TableKey, Vec<Column>>> {
    const PURPOSE: &str = "columns";
    // The relation type bind comes first: `?` placeholders are positional.
    let filter = adapter.config.schema_filter.clause("c.TABLE_SCHEMA", &SCOPE, 2);
    let query = format!(
        r#"
        SELECT
            CAST(c.TABLE_SCHEMA AS CHAR) AS owner,
            CAST(c.TABLE_NAME AS CHAR) AS table_name,
            CAST(c.COLUMN_NAME AS CHAR) AS name,
            CAST(c.ORDINAL_POSITION AS SIGNED) AS ordinal,
            CAST(c.COLUMN_TYPE AS CHAR) AS data_type,
            CAST(c.CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS char_length,
            CAST(c.NUMERIC_PRECISION AS SIGNED) AS num_precision,
            CAST(c.NUMERIC_SCALE AS SIGNED) AS num_scale,
            CAST(c.IS_NULLABLE AS CHAR) AS is_nullable,
            CAST(c.COLUMN_DEFAULT AS CHAR) AS default_value,
            CAST(c.COLUMN_COMMENT AS CHAR) AS comment,
            CAST(c.COLUMN_KEY AS CHAR) AS column_key,
            CAST(c.EXTRA AS CHAR) AS extra,
            CAST(c.CHARACTER_SET_NAME AS CHAR) AS character_set,
            CAST(c.COLLATION_NAME AS CHAR) AS collation_name
        FROM INFORMATION_SCHEMA.COLUMNS c
        JOIN INFORMATION_SCHEMA.TABLES t
          ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
        WHERE t.TABLE_TYPE = ?
          AND {}
        ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION
        "#,
        filter.sql
    );
    let mut binds = Vec::with_capacity(filter.binds.len() + 1);
    binds.push(table_type.to_string());
    binds.extend(filter.binds);
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required::<String>("owner", PURPOSE)?,
            row.required::<String>("table_name", PURPOSE)?,
        );
        let ordinal: i64 = row.required("ordinal", PURPOSE)?;
        let column_key: String = row.field::<Option<String>>("column_key", PURPOSE)?.unwrap_or_default();
        let extra: String = row.field::<Option<String>>("extra", PURPOSE)?.unwrap_or_default();
        let is_nullable: String = row.required("is_nullable", PURPOSE)?;

        keyed.push((
            key,
            Column {
                name: row.required("name", PURPOSE)?,
                position: i32::try_from(ordinal).unwrap_or(i32::MAX),
                data_type: row.required("data_type", PURPOSE)?,
                length: positive(row.field("char_length", PURPOSE)?),
                precision: positive(row.field("num_precision", PURPOSE)?),
                scale: row.field("num_scale", PURPOSE)?,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                default_value: row.field("default_value", PURPOSE)?,
                comment: non_empty(row.field("comment", PURPOSE)?),
                is_primary_key: column_key == "PRI",
                is_unique: column_key == "UNI",
                is_auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
                character_set: non_empty(row.field("character_set", PURPOSE)?),
                collation: non_empty(row.field("collation_name", PURPOSE)?),
                ..Default::default()
            },
        ));
    }
    Ok(group_by_table(keyed))
}

/// Primary-key, unique and foreign-key column rows, in constraint order.
async fn fetch_constraints(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<ConstraintRow>>> {
    const PURPOSE: &str = "table constraints";
    let filter = adapter.config.schema_filter.clause("k.TABLE_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(k.TABLE_SCHEMA AS CHAR) AS owner,
            CAST(k.TABLE_NAME AS CHAR) AS table_name,
            CAST(tc.CONSTRAINT_TYPE AS CHAR) AS constraint_type,
            CAST(k.COLUMN_NAME AS CHAR) AS column_name,
            CAST(k.REFERENCED_TABLE_SCHEMA AS CHAR) AS ref_owner,
            CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS ref_table,
            CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS ref_column
        FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE k
        JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
          ON tc.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
         AND tc.CONSTRAINT_NAME = k.CONSTRAINT_NAME
         AND tc.TABLE_SCHEMA = k.TABLE_SCHEMA
         AND tc.TABLE_NAME = k.TABLE_NAME
        WHERE tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
          AND {}
        ORDER BY k.TABLE_SCHEMA, k.TABLE_NAME, k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required::<String>("owner", PURPOSE)?,
            row.required::<String>("table_name", PURPOSE)?,
        );
        let column: String = row.required("column_name", PURPOSE)?;
        let constraint_type: String = row.required("constraint_type", PURPOSE)?;
        let constraint = match constraint_type.as_str() {
            "PRIMARY KEY" => ConstraintRow::primary_key(column),
            "UNIQUE" => ConstraintRow::unique(column),
            _ => {
                let ref_owner: Option<String> = row.field("ref_owner", PURPOSE)?;
                let ref_table: Option<String> = row.field("ref_table", PURPOSE)?;
                let ref_column: Option<String> = row.field("ref_column", PURPOSE)?;
                let table = match (ref_owner, ref_table) {
                    (Some(owner), Some(table)) => format!("{}.{}", owner, table),
                    (_, table) => table.unwrap_or_default(),
                };
                ConstraintRow::foreign_key(column, table, ref_column.unwrap_or_default())
            }
        };
        keyed.push((key, constraint));
    }
    Ok(group_by_table(keyed))
}

/// Indexes from `STATISTICS`, key columns ordered by `SEQ_IN_INDEX`.
///
/// Functional key parts (MySQL 8.0.13+) have no column name and are
/// reported as `<expression>`.
async fn fetch_indexes(
    adapter: &MySqlAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<Index>>> {
    const PURPOSE: &str = "indexes";
    let filter = adapter.config.schema_filter.clause("s.TABLE_SCHEMA", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            CAST(s.TABLE_SCHEMA AS CHAR) AS owner,
            CAST(s.TABLE_NAME AS CHAR) AS table_name,
            CAST(s.INDEX_NAME AS CHAR) AS index_name,
            CAST(s.INDEX_TYPE AS CHAR) AS index_type,
            CAST(s.NON_UNIQUE AS SIGNED) AS non_unique,
            CAST(COALESCE(s.COLUMN_NAME, '<expression>') AS CHAR) AS column_name,
            CAST(s.SEQ_IN_INDEX AS SIGNED) AS key_position,
            CAST(s.INDEX_COMMENT AS CHAR) AS comment
        FROM INFORMATION_SCHEMA.STATISTICS s
        WHERE {}
        ORDER BY s.TABLE_SCHEMA, s.TABLE_NAME, s.INDEX_NAME, s.SEQ_IN_INDEX
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut builder = IndexBuilder::new();
    for row in &rows {
        let owner: String = row.required("owner", PURPOSE)?;
        let table_name: String = row.required("table_name", PURPOSE)?;
        let name: String = row.required("index_name", PURPOSE)?;
        let non_unique: i64 = row.required("non_unique", PURPOSE)?;
        let header = Index {
            is_primary: name == "PRIMARY",
            name,
            table_name: table_name.clone(),
            owner: Some(owner.clone()),
            index_type: row.required("index_type", PURPOSE)?,
            columns: Vec::new(),
            is_unique: non_unique == 0,
            is_enabled: true,
            comment: non_empty(row.field("comment", PURPOSE)?),
            created_at: None,
        };
        builder.push(
            TableKey::new(owner, table_name),
            header,
            row.required::<String>("column_name", PURPOSE)?,
            row.required::<i64>("key_position", PURPOSE)?,
        );
    }
    Ok(builder.finish())
}
