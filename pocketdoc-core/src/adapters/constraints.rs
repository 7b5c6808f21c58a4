//! Constraint & relationship resolution shared by every dialect adapter.
//!
//! Adapters fetch primary-key, unique and foreign-key rows for a whole
//! namespace in one query, group them per table with [`TableKey`], and fold
//! each group into a [`ConstraintSet`]: one structured record per column,
//! built in a single pass. Index key rows go through [`IndexBuilder`], which
//! restores key-sequence order regardless of the order rows arrive in.
//!
//! # Known limitation
//! A column covered by more than one foreign key reports only the first one
//! the catalog returns. Catalog order is not guaranteed to match between
//! dialects, so the chosen target may differ across engines.

use crate::models::{Column, Index};
use std::collections::HashMap;

/// Referenced table (qualified as the dialect reports it) and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

/// Constraint participation of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey(ForeignKeyTarget),
}

/// A single `(column, constraint)` row from a constraint catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRow {
    pub column: String,
    pub kind: ConstraintKind,
}

impl ConstraintRow {
    /// `column` is part of the primary key.
    pub fn primary_key(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: ConstraintKind::PrimaryKey,
        }
    }

    /// `column` is covered by a unique constraint.
    pub fn unique(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: ConstraintKind::Unique,
        }
    }

    /// `column` references `table.target_column`.
    pub fn foreign_key(
        column: impl Into<String>,
        table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            kind: ConstraintKind::ForeignKey(ForeignKeyTarget {
                table: table.into(),
                column: target_column.into(),
            }),
        }
    }
}

/// Resolved constraint flags of one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnConstraints {
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub foreign_key: Option<ForeignKeyTarget>,
}

/// Per-column constraint flags of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    columns: HashMap<String, ColumnConstraints>,
}

impl ConstraintSet {
    /// Folds catalog rows, in catalog order, into per-column flags.
    ///
    /// The first foreign key seen for a column is kept; later ones are
    /// ignored.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = ConstraintRow>,
    {
        let mut columns: HashMap<String, ColumnConstraints> = HashMap::new();
        for row in rows {
            let entry = columns.entry(row.column).or_default();
            match row.kind {
                ConstraintKind::PrimaryKey => entry.is_primary_key = true,
                ConstraintKind::Unique => entry.is_unique = true,
                ConstraintKind::ForeignKey(target) => {
                    if entry.foreign_key.is_none() {
                        entry.foreign_key = Some(target);
                    } else {
                        tracing::debug!(
                            "Column references more than one table; keeping first foreign key, ignoring {}.{}",
                            target.table,
                            target.column
                        );
                    }
                }
            }
        }
        Self { columns }
    }

    /// Flags recorded for `column`, if any.
    pub fn get(&self, column: &str) -> Option<&ColumnConstraints> {
        self.columns.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Writes the flags onto matching columns.
    ///
    /// Flags already set by the column query (e.g. MySQL `COLUMN_KEY`) are
    /// kept. Foreign key targets are always written as a pair.
    pub fn apply(&self, columns: &mut [Column]) {
        for column in columns.iter_mut() {
            let Some(flags) = self.columns.get(&column.name) else {
                continue;
            };
            column.is_primary_key |= flags.is_primary_key;
            column.is_unique |= flags.is_unique;
            if let Some(target) = &flags.foreign_key {
                if target.table.is_empty() || target.column.is_empty() {
                    tracing::warn!(
                        "Foreign key on column {} has no resolvable target; leaving it unflagged",
                        column.name
                    );
                    continue;
                }
                column.set_foreign_key(target.table.clone(), target.column.clone());
            }
        }
    }
}

/// `(owner, table)` key used to group bulk catalog rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub owner: String,
    pub name: String,
}

impl TableKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// Groups rows per table, preserving row order inside each group.
pub fn group_by_table<T, I>(rows: I) -> HashMap<TableKey, Vec<T>>
where
    I: IntoIterator<Item = (TableKey, T)>,
{
    let mut grouped: HashMap<TableKey, Vec<T>> = HashMap::new();
    for (key, row) in rows {
        grouped.entry(key).or_default().push(row);
    }
    grouped
}

struct PendingIndex {
    header: Index,
    keys: Vec<(i64, String)>,
}

/// Assembles indexes from one-row-per-key-column catalog output.
///
/// Rows may arrive in any order. Indexes are emitted per table in the order
/// their first row was seen, with columns sorted by key position.
#[derive(Default)]
pub struct IndexBuilder {
    order: Vec<(TableKey, String)>,
    pending: HashMap<(TableKey, String), PendingIndex>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one key column of an index.
    ///
    /// # Arguments
    /// * `table` - Owning table of the index
    /// * `header` - Index attributes; only the first header seen per index is kept
    /// * `column` - Key column name or expression placeholder
    /// * `key_position` - Catalog key-sequence number
    pub fn push(
        &mut self,
        table: TableKey,
        header: Index,
        column: impl Into<String>,
        key_position: i64,
    ) {
        let key = (table, header.name.clone());
        let column = column.into();
        match self.pending.get_mut(&key) {
            Some(pending) => pending.keys.push((key_position, column)),
            None => {
                self.order.push(key.clone());
                self.pending.insert(
                    key,
                    PendingIndex {
                        header,
                        keys: vec![(key_position, column)],
                    },
                );
            }
        }
    }

    /// Emits the collected indexes grouped by owning table.
    pub fn finish(mut self) -> HashMap<TableKey, Vec<Index>> {
        let mut by_table: HashMap<TableKey, Vec<Index>> = HashMap::new();
        for key in self.order {
            let Some(mut pending) = self.pending.remove(&key) else {
                continue;
            };
            pending.keys.sort_by_key(|(position, _)| *position);
            let mut index = pending.header;
            index.columns = pending.keys.into_iter().map(|(_, column)| column).collect();
            by_table.entry(key.0).or_default().push(index);
        }
        by_table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, position: i32) -> Column {
        Column {
            name: name.to_string(),
            position,
            data_type: "NUMBER".to_string(),
            nullable: true,
            ..Default::default()
        }
    }

    fn header(name: &str, table: &str) -> Index {
        Index {
            name: name.to_string(),
            table_name: table.to_string(),
            owner: Some("HR".to_string()),
            index_type: "NORMAL".to_string(),
            columns: Vec::new(),
            is_unique: false,
            is_primary: false,
            is_enabled: true,
            comment: None,
            created_at: None,
        }
    }

    #[test]
    fn test_apply_sets_flags_and_fk_targets_together() {
        let set = ConstraintSet::from_rows([
            ConstraintRow::primary_key("EMPLOYEE_ID"),
            ConstraintRow::unique("EMAIL"),
            ConstraintRow::foreign_key("DEPARTMENT_ID", "HR.DEPARTMENTS", "DEPARTMENT_ID"),
        ]);
        let mut columns = vec![
            column("EMPLOYEE_ID", 1),
            column("EMAIL", 2),
            column("DEPARTMENT_ID", 3),
            column("SALARY", 4),
        ];
        set.apply(&mut columns);

        assert!(columns[0].is_primary_key);
        assert!(columns[1].is_unique);
        assert!(columns[2].is_foreign_key);
        assert_eq!(columns[2].fk_target_table.as_deref(), Some("HR.DEPARTMENTS"));
        assert_eq!(columns[2].fk_target_column.as_deref(), Some("DEPARTMENT_ID"));

        for column in &columns {
            assert_eq!(
                column.is_foreign_key,
                column.fk_target_table.is_some() && column.fk_target_column.is_some(),
                "column {}",
                column.name
            );
            if !column.is_foreign_key {
                assert!(column.fk_target_table.is_none());
                assert!(column.fk_target_column.is_none());
            }
        }
    }

    #[test]
    fn test_first_foreign_key_wins() {
        let set = ConstraintSet::from_rows([
            ConstraintRow::foreign_key("MANAGER_ID", "HR.EMPLOYEES", "EMPLOYEE_ID"),
            ConstraintRow::foreign_key("MANAGER_ID", "HR.CONTRACTORS", "CONTRACTOR_ID"),
        ]);
        let target = set
            .get("MANAGER_ID")
            .and_then(|c| c.foreign_key.clone())
            .unwrap();
        assert_eq!(target.table, "HR.EMPLOYEES");
        assert_eq!(target.column, "EMPLOYEE_ID");
    }

    #[test]
    fn test_column_can_be_primary_and_foreign_key() {
        let set = ConstraintSet::from_rows([
            ConstraintRow::primary_key("ORDER_ID"),
            ConstraintRow::foreign_key("ORDER_ID", "public.orders", "id"),
        ]);
        let mut columns = vec![column("ORDER_ID", 1)];
        set.apply(&mut columns);
        assert!(columns[0].is_primary_key);
        assert!(columns[0].is_foreign_key);
    }

    #[test]
    fn test_apply_keeps_flags_from_column_query() {
        let mut columns = vec![column("id", 1)];
        columns[0].is_primary_key = true;
        ConstraintSet::default().apply(&mut columns);
        assert!(columns[0].is_primary_key);
        assert!(!columns[0].is_foreign_key);
    }

    #[test]
    fn test_foreign_key_without_target_is_not_flagged() {
        let set = ConstraintSet::from_rows([ConstraintRow::foreign_key("X", "", "")]);
        let mut columns = vec![column("X", 1)];
        set.apply(&mut columns);
        assert!(!columns[0].is_foreign_key);
        assert!(columns[0].fk_target_table.is_none());
    }

    #[test]
    fn test_group_by_table_preserves_row_order() {
        let grouped = group_by_table([
            (TableKey::new("HR", "EMP"), 1),
            (TableKey::new("HR", "DEPT"), 2),
            (TableKey::new("HR", "EMP"), 3),
        ]);
        assert_eq!(grouped[&TableKey::new("HR", "EMP")], vec![1, 3]);
        assert_eq!(grouped[&TableKey::new("HR", "DEPT")], vec![2]);
        assert_eq!(TableKey::new("HR", "EMP").to_string(), "HR.EMP");
    }

    #[test]
    fn test_index_columns_follow_key_position() {
        // Composite index (LAST_NAME, FIRST_NAME, HIRE_DATE) delivered out of order.
        let emp = TableKey::new("HR", "EMPLOYEES");
        let mut builder = IndexBuilder::new();
        builder.push(emp.clone(), header("EMP_NAME_IX", "EMPLOYEES"), "HIRE_DATE", 3);
        builder.push(emp.clone(), header("EMP_NAME_IX", "EMPLOYEES"), "LAST_NAME", 1);
        builder.push(emp.clone(), header("EMP_PK", "EMPLOYEES"), "EMPLOYEE_ID", 1);
        builder.push(emp.clone(), header("EMP_NAME_IX", "EMPLOYEES"), "FIRST_NAME", 2);

        let by_table = builder.finish();
        let indexes = &by_table[&emp];
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, "EMP_NAME_IX");
        assert_eq!(indexes[0].columns, ["LAST_NAME", "FIRST_NAME", "HIRE_DATE"]);
        assert_eq!(indexes[1].name, "EMP_PK");
        assert_eq!(indexes[1].columns, ["EMPLOYEE_ID"]);
    }

    #[test]
    fn test_same_index_name_on_different_tables_stays_separate() {
        let mut builder = IndexBuilder::new();
        builder.push(TableKey::new("a", "t1"), header("idx", "t1"), "x", 1);
        builder.push(TableKey::new("b", "t2"), header("idx", "t2"), "y", 1);
        let by_table = builder.finish();
        assert_eq!(by_table[&TableKey::new("a", "t1")][0].columns, ["x"]);
        assert_eq!(by_table[&TableKey::new("b", "t2")][0].columns, ["y"]);
    }
}
