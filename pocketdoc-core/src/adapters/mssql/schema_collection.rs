//! SQL Server table, column, constraint and index collection from `sys.*`.

use super::connection::{TdsRowExt, description_join, iso_timestamp};
use super::{SCOPE, SqlServerAdapter};
use crate::adapters::constraints::{
    ConstraintRow, ConstraintSet, IndexBuilder, TableKey, group_by_table,
};
use crate::context::ExtractionContext;
use crate::error::PocketDocError;
use crate::models::*;
use crate::Result;
use std::collections::HashMap;

pub(crate) async fn database_info(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<DatabaseInfo> {
    const PURPOSE: &str = "database name and version";
    let rows = adapter
        .fetch_rows(
            ctx,
            PURPOSE,
            "SELECT CAST(DB_NAME() AS NVARCHAR(128)) AS name, CAST(@@VERSION AS NVARCHAR(4000)) AS version",
            &[],
        )
        .await?;
    let row = rows
        .first()
        .ok_or_else(|| PocketDocError::unexpected_null("version", PURPOSE))?;
    Ok(DatabaseInfo {
        name: row.required_text("name", PURPOSE)?,
        version: row.required_text("version", PURPOSE)?,
    })
}

pub(crate) async fn collect_tables(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<Vec<Table>> {
    const PURPOSE: &str = "tables";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            t.name AS name,
            CAST('TABLE' AS NVARCHAR(20)) AS table_type,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            CAST((SELECT SUM(p.rows) FROM sys.partitions p
                  WHERE p.object_id = t.object_id AND p.index_id IN (0, 1)) AS BIGINT) AS row_count,
            {created} AS created_at,
            {modified} AS modified_at
        FROM sys.tables t
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        {description}
        WHERE t.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, t.name
        "#,
        created = iso_timestamp("t.create_date"),
        modified = iso_timestamp("t.modify_date"),
        description = description_join("ep", "t.object_id", "0", 1),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut columns = fetch_columns(adapter, ctx, "U").await?;
    let constraints = fetch_constraints(adapter, ctx).await?;
    let mut indexes = fetch_indexes(adapter, ctx).await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner = row.required_text("owner", PURPOSE)?;
        let name = row.required_text("name", PURPOSE)?;
        let key = TableKey::new(owner.clone(), name.clone());

        let mut table_columns = columns.remove(&key).unwrap_or_default();
        if let Some(rows) = constraints.get(&key) {
            ConstraintSet::from_rows(rows.iter().cloned()).apply(&mut table_columns);
        }

        tracing::debug!("Collected table {} with {} columns", key, table_columns.len());
        tables.push(Table {
            name,
            owner: Some(owner),
            table_type: row.required_text("table_type", PURPOSE)?,
            comment: non_empty(row.text("comment", PURPOSE)?),
            columns: table_columns,
            indexes: indexes.remove(&key).unwrap_or_default(),
            row_count: row.int("row_count", PURPOSE)?,
            created_at: row.text("created_at", PURPOSE)?,
            modified_at: row.text("modified_at", PURPOSE)?,
        });
    }
    Ok(tables)
}

/// Columns of every object of `sys.objects.type` `object_type` (`U` or
/// `V`), grouped per object and ordered by `column_id`.
///
/// Character lengths are reported in characters; `max` types have no
/// length.
pub(crate) async fn fetch_columns(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
    object_type: &str,
) -> Result<HashMap<TableKey, Vec<Column>>> {
    const PURPOSE: &str = "columns";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 2);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            o.name AS table_name,
            c.name AS name,
            CAST(c.column_id AS BIGINT) AS ordinal,
            ty.name AS data_type,
            CAST(CASE
                WHEN c.max_length = -1 THEN NULL
                WHEN ty.name IN ('nchar', 'nvarchar') THEN c.max_length / 2
                WHEN ty.name IN ('char', 'varchar', 'binary', 'varbinary') THEN c.max_length
            END AS BIGINT) AS char_length,
            CAST(CASE WHEN ty.name IN ('decimal', 'numeric') THEN c.precision END AS BIGINT) AS num_precision,
            CAST(CASE WHEN ty.name IN ('decimal', 'numeric') THEN c.scale END AS BIGINT) AS num_scale,
            c.is_nullable AS is_nullable,
            CAST(dc.definition AS NVARCHAR(4000)) AS default_value,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            c.is_identity AS is_identity,
            c.collation_name AS collation_name
        FROM sys.columns c
        JOIN sys.objects o ON o.object_id = c.object_id
        JOIN sys.schemas s ON s.schema_id = o.schema_id
        JOIN sys.types ty ON ty.user_type_id = c.user_type_id
        LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id
        {description}
        WHERE o.type = @P1
          AND o.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, o.name, c.column_id
        "#,
        description = description_join("ep", "c.object_id", "c.column_id", 1),
        filter = filter.sql
    );
    let mut binds = Vec::with_capacity(filter.binds.len() + 1);
    binds.push(object_type.to_string());
    binds.extend(filter.binds);
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required_text("owner", PURPOSE)?,
            row.required_text("table_name", PURPOSE)?,
        );
        let ordinal = row.required_int("ordinal", PURPOSE)?;
        keyed.push((
            key,
            Column {
                name: row.required_text("name", PURPOSE)?,
                position: i32::try_from(ordinal).unwrap_or(i32::MAX),
                data_type: row.required_text("data_type", PURPOSE)?,
                length: positive(row.int("char_length", PURPOSE)?),
                precision: positive(row.int("num_precision", PURPOSE)?),
                scale: row.int("num_scale", PURPOSE)?,
                nullable: row.flag("is_nullable", PURPOSE)?.unwrap_or(true),
                default_value: non_empty(row.text("default_value", PURPOSE)?),
                comment: non_empty(row.text("comment", PURPOSE)?),
                is_auto_increment: row.flag("is_identity", PURPOSE)?.unwrap_or(false),
                collation: non_empty(row.text("collation_name", PURPOSE)?),
                ..Default::default()
            },
        ));
    }
    Ok(group_by_table(keyed))
}

/// Primary-key, unique and foreign-key column rows, in constraint order.
///
/// Key constraints resolve their columns through the backing index; foreign
/// keys pair each referencing column with its referenced column.
async fn fetch_constraints(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<ConstraintRow>>> {
    const PURPOSE: &str = "table constraints";
    let keys = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let foreign = adapter
        .config
        .schema_filter
        .clause("s.name", &SCOPE, keys.next_index(1));
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            t.name AS table_name,
            kc.name AS constraint_name,
            CAST(kc.type AS NVARCHAR(2)) AS kind,
            col.name AS column_name,
            CAST(NULL AS NVARCHAR(128)) AS ref_owner,
            CAST(NULL AS NVARCHAR(128)) AS ref_table,
            CAST(NULL AS NVARCHAR(128)) AS ref_column,
            CAST(ic.key_ordinal AS BIGINT) AS ord
        FROM sys.key_constraints kc
        JOIN sys.tables t ON t.object_id = kc.parent_object_id
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        JOIN sys.index_columns ic
          ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
        JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
        WHERE {keys}
        UNION ALL
        SELECT
            s.name,
            t.name,
            fk.name,
            CAST('F' AS NVARCHAR(2)),
            pc.name,
            rs.name,
            rt.name,
            rc.name,
            CAST(fkc.constraint_column_id AS BIGINT)
        FROM sys.foreign_keys fk
        JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
        JOIN sys.tables t ON t.object_id = fk.parent_object_id
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        JOIN sys.columns pc
          ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
        JOIN sys.objects rt ON rt.object_id = fkc.referenced_object_id
        JOIN sys.schemas rs ON rs.schema_id = rt.schema_id
        JOIN sys.columns rc
          ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
        WHERE {foreign}
        ORDER BY owner, table_name, constraint_name, ord
        "#,
        keys = keys.sql,
        foreign = foreign.sql
    );
    let mut binds = keys.binds;
    binds.extend(foreign.binds);
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &binds).await?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in &rows {
        let key = TableKey::new(
            row.required_text("owner", PURPOSE)?,
            row.required_text("table_name", PURPOSE)?,
        );
        let column = row.required_text("column_name", PURPOSE)?;
        let constraint = match row.required_text("kind", PURPOSE)?.trim() {
            "PK" => ConstraintRow::primary_key(column),
            "UQ" => ConstraintRow::unique(column),
            _ => {
                let table = match (
                    row.text("ref_owner", PURPOSE)?,
                    row.text("ref_table", PURPOSE)?,
                ) {
                    (Some(owner), Some(table)) => format!("{}.{}", owner, table),
                    (_, table) => table.unwrap_or_default(),
                };
                ConstraintRow::foreign_key(
                    column,
                    table,
                    row.text("ref_column", PURPOSE)?.unwrap_or_default(),
                )
            }
        };
        keyed.push((key, constraint));
    }
    Ok(group_by_table(keyed))
}

/// Indexes of user tables, key columns ordered by `key_ordinal`.
///
/// Included (non-key) columns are skipped. Columnstore indexes have no key
/// order; their columns follow `index_column_id`.
async fn fetch_indexes(
    adapter: &SqlServerAdapter,
    ctx: &ExtractionContext,
) -> Result<HashMap<TableKey, Vec<Index>>> {
    const PURPOSE: &str = "indexes";
    let filter = adapter.config.schema_filter.clause("s.name", &SCOPE, 1);
    let query = format!(
        r#"
        SELECT
            s.name AS owner,
            t.name AS table_name,
            i.name AS index_name,
            CAST(i.type_desc AS NVARCHAR(60)) AS index_type,
            i.is_unique AS is_unique,
            i.is_primary_key AS is_primary,
            CAST(CASE WHEN i.is_disabled = 1 THEN 0 ELSE 1 END AS BIT) AS is_enabled,
            CAST(ep.value AS NVARCHAR(4000)) AS comment,
            col.name AS column_name,
            CAST(CASE WHEN ic.key_ordinal > 0 THEN ic.key_ordinal
                      ELSE ic.index_column_id END AS BIGINT) AS key_position
        FROM sys.indexes i
        JOIN sys.tables t ON t.object_id = i.object_id
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
        JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
        {description}
        WHERE i.type > 0
          AND i.is_hypothetical = 0
          AND ic.is_included_column = 0
          AND t.is_ms_shipped = 0
          AND {filter}
        ORDER BY s.name, t.name, i.name, key_position
        "#,
        description = description_join("ep", "i.object_id", "i.index_id", 7),
        filter = filter.sql
    );
    let rows = adapter.fetch_rows(ctx, PURPOSE, &query, &filter.binds).await?;

    let mut builder = IndexBuilder::new();
    for row in &rows {
        let owner = row.required_text("owner", PURPOSE)?;
        let table_name = row.required_text("table_name", PURPOSE)?;
        let header = Index {
            name: row.required_text("index_name", PURPOSE)?,
            table_name: table_name.clone(),
            owner: Some(owner.clone()),
            index_type: row.required_text("index_type", PURPOSE)?,
            columns: Vec::new(),
            is_unique: row.flag("is_unique", PURPOSE)?.unwrap_or(false),
            is_primary: row.flag("is_primary", PURPOSE)?.unwrap_or(false),
            is_enabled: row.flag("is_enabled", PURPOSE)?.unwrap_or(true),
            comment: non_empty(row.text("comment", PURPOSE)?),
            created_at: None,
        };
        builder.push(
            TableKey::new(owner, table_name),
            header,
            row.required_text("column_name", PURPOSE)?,
            row.required_int("key_position", PURPOSE)?,
        );
    }
    Ok(builder.finish())
}
