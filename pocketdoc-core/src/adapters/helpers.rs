//! Helper utilities shared by the sqlx-backed adapters.

use crate::{Result, error::PocketDocError};
use sqlx::{ColumnIndex, Decode, Row, Type};

/// Extension trait for extracting typed values from catalog rows with
/// consistent error context.
///
/// # Example
/// ```rust,ignore
/// use crate::adapters::helpers::RowExt;
///
/// let name: String = row.required("table_name", "tables")?;
/// let comment: Option<String> = row.field("comment", "tables")?;
/// ```
pub(crate) trait RowExt: Row {
    /// Extracts a typed field, wrapping decode failures as mapping errors.
    ///
    /// # Arguments
    /// * `field_name` - Name of the column to extract
    /// * `purpose` - What the query was fetching, for error messages
    fn field<'r, T>(&'r self, field_name: &str, purpose: &str) -> Result<T>
    where
        T: Decode<'r, Self::Database> + Type<Self::Database>;

    /// Extracts a field the model requires; NULL is a mapping error.
    fn required<'r, T>(&'r self, field_name: &str, purpose: &str) -> Result<T>
    where
        Option<T>: Decode<'r, Self::Database> + Type<Self::Database>,
    {
        self.field::<Option<T>>(field_name, purpose)?
            .ok_or_else(|| PocketDocError::unexpected_null(field_name, purpose))
    }
}

impl<R> RowExt for R
where
    R: Row,
    for<'a> &'a str: ColumnIndex<R>,
{
    fn field<'r, T>(&'r self, field_name: &str, purpose: &str) -> Result<T>
    where
        T: Decode<'r, Self::Database> + Type<Self::Database>,
    {
        self.try_get(field_name)
            .map_err(|e| PocketDocError::mapping(field_name, purpose, e))
    }
}

/// Binds every value of a rendered filter clause, in order.
pub(crate) fn bind_all<'q, DB>(
    mut query: sqlx::query::Query<'q, DB, <DB as sqlx::Database>::Arguments<'q>>,
    binds: &'q [String],
) -> sqlx::query::Query<'q, DB, <DB as sqlx::Database>::Arguments<'q>>
where
    DB: sqlx::Database,
    &'q str: sqlx::Encode<'q, DB> + Type<DB>,
{
    for value in binds {
        query = query.bind(value.as_str());
    }
    query
}
