//! Literal SQL rendering: values are inlined, so every function returns plain text.
//!
//! ```rust
//! use sql_helper::prelude::*;
//!
//! let values = ColumnValues::new().with("a", 1).with("b", RowValues::Null);
//! assert_eq!(
//!     sql::insert("t", &values).unwrap(),
//!     "insert into t (a, b) values (1, null)"
//! );
//! ```

use crate::builder::{SelectOptions, SqlBuilder};
use crate::condition::{ColumnValues, Condition};
use crate::error::Result;
use crate::types::RowValues;

const LITERAL: SqlBuilder = SqlBuilder::literal();

/// See [`crate::builder::value`].
///
/// # Errors
///
/// `UnsupportedType` for values with no literal form.
pub fn value(value: &RowValues) -> Result<String> {
    crate::builder::value(value)
}

/// # Errors
///
/// See [`SqlBuilder::where_clause`].
pub fn where_clause<I>(conditions: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    Ok(LITERAL.where_clause(conditions)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::order`].
pub fn order<I, S>(fields: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    LITERAL.order(fields)
}

/// # Errors
///
/// See [`SqlBuilder::select`].
pub fn select(table: &str, options: &SelectOptions) -> Result<String> {
    Ok(LITERAL.select(table, options)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::count`].
pub fn count<I>(table: &str, conditions: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    Ok(LITERAL.count(table, conditions)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::delete`].
pub fn delete<I>(table: &str, conditions: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    Ok(LITERAL.delete(table, conditions)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::insert`].
pub fn insert(table: &str, values: &ColumnValues) -> Result<String> {
    Ok(LITERAL.insert(table, values)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::insert_ignore`].
pub fn insert_ignore(table: &str, values: &ColumnValues) -> Result<String> {
    Ok(LITERAL.insert_ignore(table, values)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::replace`].
pub fn replace(table: &str, values: &ColumnValues) -> Result<String> {
    Ok(LITERAL.replace(table, values)?.query)
}

/// # Errors
///
/// See [`SqlBuilder::update`].
pub fn update<I>(table: &str, values: &ColumnValues, conditions: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    Ok(LITERAL.update(table, values, conditions)?.query)
}
