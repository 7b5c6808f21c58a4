//! Schema/owner filter applied inside every catalog query.
//!
//! The filter is an ordered allow-list of namespace names. When it is empty
//! each dialect falls back to the single namespace implied by the connection;
//! those defaults are hard-coded per adapter through [`DialectScope`].
//! Names are bound exactly as configured: identifier case folding is left to
//! the server.

use serde::{Deserialize, Serialize};

/// Bind parameter syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1, $2` (PostgreSQL)
    Dollar,
    /// `?, ?` (MySQL)
    Question,
    /// `@P1, @P2` (SQL Server / TDS)
    AtP,
    /// `:1, :2` (Oracle)
    Colon,
}

impl PlaceholderStyle {
    /// Renders the placeholder for the 1-based bind `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Dollar => format!("${}", index),
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::AtP => format!("@P{}", index),
            PlaceholderStyle::Colon => format!(":{}", index),
        }
    }
}

/// Per-dialect filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectScope {
    /// Bind syntax of the driver
    pub placeholder: PlaceholderStyle,
    /// SQL expression naming the default namespace when the filter is empty
    pub default_owner: &'static str,
}

/// A rendered filter predicate and the values to bind for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    /// Predicate text, e.g. `owner IN (:1, :2)`
    pub sql: String,
    /// Values for the clause's placeholders, in order
    pub binds: Vec<String>,
}

impl FilterClause {
    /// Index of the next free bind slot after this clause's binds.
    pub fn next_index(&self, first_index: usize) -> usize {
        first_index + self.binds.len()
    }
}

/// Ordered, de-duplicated set of schema/owner names.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::filter::{DialectScope, PlaceholderStyle, SchemaFilter};
///
/// const SCOPE: DialectScope = DialectScope {
///     placeholder: PlaceholderStyle::Colon,
///     default_owner: "USER",
/// };
///
/// let filter = SchemaFilter::new(["HR", "SALES"]);
/// let clause = filter.clause("t.OWNER", &SCOPE, 1);
/// assert_eq!(clause.sql, "t.OWNER IN (:1, :2)");
/// assert_eq!(clause.binds, vec!["HR", "SALES"]);
///
/// let clause = SchemaFilter::default().clause("t.OWNER", &SCOPE, 1);
/// assert_eq!(clause.sql, "t.OWNER = USER");
/// assert!(clause.binds.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SchemaFilter {
    schemas: Vec<String>,
}

impl From<Vec<String>> for SchemaFilter {
    fn from(schemas: Vec<String>) -> Self {
        Self::new(schemas)
    }
}

impl From<SchemaFilter> for Vec<String> {
    fn from(filter: SchemaFilter) -> Self {
        filter.schemas
    }
}

impl SchemaFilter {
    /// Builds a filter, dropping blank entries and later duplicates.
    pub fn new<I, S>(schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for schema in schemas {
            let schema = schema.into().trim().to_string();
            if !schema.is_empty() && !unique.contains(&schema) {
                unique.push(schema);
            }
        }
        Self { schemas: unique }
    }

    /// True when no names are configured.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Configured names in order.
    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Renders `column IN (...)` for the configured names, or
    /// `column = <default>` when the filter is empty.
    ///
    /// # Arguments
    /// * `column` - Qualified owner column in the catalog query
    /// * `scope` - Dialect placeholder syntax and default namespace
    /// * `first_index` - 1-based index of the first bind slot
    pub fn clause(&self, column: &str, scope: &DialectScope, first_index: usize) -> FilterClause {
        if self.schemas.is_empty() {
            return FilterClause {
                sql: format!("{} = {}", column, scope.default_owner),
                binds: Vec::new(),
            };
        }

        let placeholders: Vec<String> = (0..self.schemas.len())
            .map(|offset| scope.placeholder.placeholder(first_index + offset))
            .collect();

        FilterClause {
            sql: format!("{} IN ({})", column, placeholders.join(", ")),
            binds: self.schemas.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PG: DialectScope = DialectScope {
        placeholder: PlaceholderStyle::Dollar,
        default_owner: "'public'",
    };
    const MYSQL: DialectScope = DialectScope {
        placeholder: PlaceholderStyle::Question,
        default_owner: "DATABASE()",
    };
    const MSSQL: DialectScope = DialectScope {
        placeholder: PlaceholderStyle::AtP,
        default_owner: "'dbo'",
    };

    #[test]
    fn test_new_trims_and_deduplicates_in_order() {
        let filter = SchemaFilter::new(["HR", " SALES ", "", "HR", "hr"]);
        assert_eq!(filter.schemas(), ["HR", "SALES", "hr"]);
    }

    #[test]
    fn test_clause_per_placeholder_style() {
        let filter = SchemaFilter::new(["a", "b"]);
        assert_eq!(filter.clause("n.nspname", &PG, 1).sql, "n.nspname IN ($1, $2)");
        assert_eq!(filter.clause("TABLE_SCHEMA", &MYSQL, 1).sql, "TABLE_SCHEMA IN (?, ?)");
        assert_eq!(filter.clause("s.name", &MSSQL, 3).sql, "s.name IN (@P3, @P4)");
    }

    #[test]
    fn test_empty_filter_uses_dialect_default() {
        let filter = SchemaFilter::default();
        assert_eq!(filter.clause("n.nspname", &PG, 1).sql, "n.nspname = 'public'");
        assert_eq!(
            filter.clause("TABLE_SCHEMA", &MYSQL, 1).sql,
            "TABLE_SCHEMA = DATABASE()"
        );
        assert_eq!(filter.clause("s.name", &MSSQL, 1).sql, "s.name = 'dbo'");
    }

    #[test]
    fn test_next_index_accounts_for_binds() {
        let filter = SchemaFilter::new(["HR"]);
        let clause = filter.clause("OWNER", &MSSQL, 1);
        assert_eq!(clause.next_index(1), 2);
        assert_eq!(SchemaFilter::default().clause("OWNER", &MSSQL, 1).next_index(1), 1);
    }

    #[test]
    fn test_filter_deserializes_from_list() {
        let filter: SchemaFilter = serde_json::from_str(r#"["HR","SALES","HR"]"#).unwrap();
        assert_eq!(filter.schemas(), ["HR", "SALES"]);
    }
}
