//! PostgreSQL table, column, constraint and index collection.
//!
//! Each kind is fetched with one query for the whole filtered scope and
//! grouped per table in memory, so the number of round trips does not grow
//! with the number of tables.

use super::{PostgresAdapter, SCOPE};
use crate::adapters::constraints::{
    ConstraintRow, ConstraintSet, IndexBuilder, TableKey, group_by_table,
};
use crate::adapters::helpers::RowExt;
use crate::context::ExtractionContext;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

pub(crate) async fn database_info(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<DatabaseInfo> {
    const PURPOSE: &str = "database name and version";
    let rows = adapter
        .fetch_rows(
            ctx,
            PURPOSE,
            "SELECT current_database()::text AS name, version()::text AS version",
            &[],
        )
        .await?;
    let row = rows
        .first()
        .ok_or_else(|| crate::error::PocketDocError::unexpected_null("version", PURPOSE))?;
    Ok(DatabaseInfo {
        name: row.required("name", PURPOSE)?,
        version: row.required("version", PURPOSE)?,
    })
}

pub(crate) async fn collect_tables(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Table>> {
    const PURPOSE: &str = "tables";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            c.relname::text AS name,
            CASE c.relkind WHEN 'p' THEN 'PARTITIONED' ELSE 'TABLE' END AS table_type,
            obj_description(c.oid, 'pg_class')::text AS comment,
            CASE WHEN c.reltuples < 0 THEN NULL ELSE c.reltuples::bigint END AS row_count
        FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('r', 'p')
          AND {}
        ORDER BY n.nspname, c.relname
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut columns = fetch_columns(adapter, ctx, "'r', 'p'").await?;
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
            created_at: None,
            modified_at: None,
        });
    }
    Ok(tables)
}

/// Columns of every relation of the given kinds, grouped per relation and
/// ordered by attribute number.
pub(crate) async fn fetch_columns(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
    relkinds: &str,
) -> Result<HashMap<TableKey, Vec<Column>>> {
    const PURPOSE: &str = "columns";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            c.relname::text AS table_name,
            a.attname::text AS name,
            a.attnum::int4 AS position,
            format_type(a.atttypid, a.atttypmod)::text AS data_type,
            CASE WHEN a.atttypid IN (1042, 1043) AND a.atttypmod > 4
                 THEN (a.atttypmod - 4)::int8 END AS length,
            CASE WHEN a.atttypid = 1700 AND a.atttypmod > 4
                 THEN (((a.atttypmod - 4) >> 16) & 65535)::int8 END AS precision,
            CASE WHEN a.atttypid = 1700 AND a.atttypmod > 4
                 THEN ((a.atttypmod - 4) & 65535)::int8 END AS scale,
            NOT a.attnotnull AS nullable,
            pg_get_expr(d.adbin, d.adrelid)::text AS default_value,
            col_description(c.oid, a.attnum)::text AS comment,
            (a.attidentity IN ('a', 'd')
                OR COALESCE(pg_get_expr(d.adbin, d.adrelid) LIKE 'nextval(%', false)) AS is_auto_increment,
            CASE WHEN co.collname IS NOT NULL AND co.collname <> 'default'
                 THEN co.collname::text END AS collation
        FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
        LEFT JOIN pg_catalog.pg_collation co ON co.oid = a.attcollation
        WHERE c.relkind IN ({})
          AND a.attnum > 0
          AND NOT a.attisdropped
          AND {}
        ORDER BY n.nspname, c.relname, a.attnum
        "#,
        relkinds, filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required::<String>("owner", PURPOSE)?,
            row.required::<String>("table_name", PURPOSE)?,
        );
        keyed.push((
            key,
            Column {
                name: row.required("name", PURPOSE)?,
                position: row.required("position", PURPOSE)?,
                data_type: row.required("data_type", PURPOSE)?,
                length: positive(row.field("length", PURPOSE)?),
                precision: positive(row.field("precision", PURPOSE)?),
                scale: row.field("scale", PURPOSE)?,
                nullable: row.required("nullable", PURPOSE)?,
                default_value: non_empty(row.field("default_value", PURPOSE)?),
                comment: non_empty(row.field("comment", PURPOSE)?),
                is_auto_increment: row.required("is_auto_increment", PURPOSE)?,
                collation: non_empty(row.field("collation", PURPOSE)?),
                ..Default::default()
            },
        ));
    }
    Ok(group_by_table(keyed))
}

/// Primary-key, unique and foreign-key column rows, in constraint order.
async fn fetch_constraints(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<ConstraintRow>>> {
    const PURPOSE: &str = "table constraints";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            c.relname::text AS table_name,
            con.contype::text AS kind,
            a.attname::text AS column_name,
            fn.nspname::text AS ref_owner,
            fc.relname::text AS ref_table,
            fa.attname::text AS ref_column
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
        LEFT JOIN pg_catalog.pg_class fc ON fc.oid = con.confrelid
        LEFT JOIN pg_catalog.pg_namespace fn ON fn.oid = fc.relnamespace
        LEFT JOIN pg_catalog.pg_attribute fa
               ON fa.attrelid = con.confrelid AND fa.attnum = con.confkey[k.ord::int4]
        WHERE con.contype IN ('p', 'u', 'f')
          AND c.relkind IN ('r', 'p')
          AND {}
        ORDER BY n.nspname, c.relname, con.conname, k.ord
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
        let kind: String = row.required("kind", PURPOSE)?;
        let constraint = match kind.as_str() {
            "p" => ConstraintRow::primary_key(column),
            "u" => ConstraintRow::unique(column),
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

/// Indexes of tables in scope, key columns ordered by key position.
///
/// Expression keys have no column name and are reported as `<expression>`.
async fn fetch_indexes(
    adapter: &PostgresAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<Index>>> {
    const PURPOSE: &str = "indexes";
    let filter = adapter.config.schema_filter.clause("n.nspname", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            n.nspname::text AS owner,
            t.relname::text AS table_name,
            i.relname::text AS index_name,
            upper(am.amname::text) AS index_type,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary,
            ix.indisvalid AS is_enabled,
            obj_description(i.oid, 'pg_class')::text AS comment,
            COALESCE(a.attname::text, '<expression>') AS column_name,
            k.ord::int8 AS key_position
        FROM pg_catalog.pg_index ix
        JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
        JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_catalog.pg_am am ON am.oid = i.relam
        CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
        LEFT JOIN pg_catalog.pg_attribute a
               ON a.attrelid = t.oid AND a.attnum = k.attnum AND k.attnum > 0
        WHERE t.relkind IN ('r', 'p')
          AND k.ord <= ix.indnkeyatts
          AND {}
        ORDER BY n.nspname, t.relname, i.relname, k.ord
        "#,
        filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut builder = IndexBuilder::new();
    for row in &rows {
        let owner: String = row.required("owner", PURPOSE)?;
        let table_name: String = row.required("table_name", PURPOSE)?;
        let header = Index {
            name: row.required("index_name", PURPOSE)?,
            table_name: table_name.clone(),
            owner: Some(owner.clone()),
            index_type: row.required("index_type", PURPOSE)?,
            columns: Vec::new(),
            is_unique: row.required("is_unique", PURPOSE)?,
            is_primary: row.required("is_primary", PURPOSE)?,
            is_enabled: row.required("is_enabled", PURPOSE)?,
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
