//! Parameterized SQL rendering: `?` placeholders plus the values to bind, in order.
//!
//! ```rust
//! use sql_helper::prelude::*;
//!
//! let qp = sql_prepared::where_clause([Condition::columns([("a", 1), ("b", 2)])]).unwrap();
//! assert_eq!(qp.query, "where a = ? and b = ?");
//! assert_eq!(qp.params, vec![RowValues::Int(1), RowValues::Int(2)]);
//! ```

use crate::builder::{SelectOptions, SqlBuilder};
use crate::condition::{ColumnValues, Condition};
use crate::error::Result;
use crate::query::QueryAndParams;

const PREPARED: SqlBuilder = SqlBuilder::parameterized();

/// # Errors
///
/// See [`SqlBuilder::where_clause`].
pub fn where_clause<I>(conditions: I) -> Result<QueryAndParams>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    PREPARED.where_clause(conditions)
}

/// An `order by` clause never carries parameters, so this renders exactly what
/// [`crate::sql::order`] does.
///
/// ```rust
/// use sql_helper::sql_prepared;
///
/// assert_eq!(sql_prepared::order(["a", "", "b desc"]).unwrap(), "order by a, b desc");
/// ```
///
/// # Errors
///
/// See [`SqlBuilder::order`].
pub fn order<I, S>(fields: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    PREPARED.order(fields)
}

/// # Errors
///
/// See [`SqlBuilder::select`].
pub fn select(table: &str, options: &SelectOptions) -> Result<QueryAndParams> {
    PREPARED.select(table, options)
}

/// # Errors
///
/// See [`SqlBuilder::count`].
pub fn count<I>(table: &str, conditions: I) -> Result<QueryAndParams>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    PREPARED.count(table, conditions)
}

/// # Errors
///
/// See [`SqlBuilder::delete`].
pub fn delete<I>(table: &str, conditions: I) -> Result<QueryAndParams>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    PREPARED.delete(table, conditions)
}

/// # Errors
///
/// See [`SqlBuilder::insert`].
pub fn insert(table: &str, values: &ColumnValues) -> Result<QueryAndParams> {
    PREPARED.insert(table, values)
}

/// # Errors
///
/// See [`SqlBuilder::insert_ignore`].
pub fn insert_ignore(table: &str, values: &ColumnValues) -> Result<QueryAndParams> {
    PREPARED.insert_ignore(table, values)
}

/// # Errors
///
/// See [`SqlBuilder::replace`].
pub fn replace(table: &str, values: &ColumnValues) -> Result<QueryAndParams> {
    PREPARED.replace(table, values)
}

/// # Errors
///
/// See [`SqlBuilder::update`].
pub fn update<I>(table: &str, values: &ColumnValues, conditions: I) -> Result<QueryAndParams>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    PREPARED.update(table, values, conditions)
}
