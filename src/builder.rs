//! SQL statement and clause builder.
//!
//! One [`SqlBuilder`] renders either literal SQL (values inlined and quoted) or
//! parameterized SQL (`?` placeholders plus an ordered bind list). Raw expressions are
//! inlined in both modes since they denote server-side computation. Every rendered clause
//! and statement goes through [`crate::safety::check`]; table and column names are held to
//! the identifier rules.

use crate::condition::Condition;
use crate::error::{Result, SqlHelperError};
use crate::expression::Expression;
use crate::query::QueryAndParams;
use crate::types::RowValues;

mod dml;
mod select;
mod where_clause;

pub use select::SelectOptions;

/// How values reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Inline every value as a SQL literal.
    #[default]
    Literal,
    /// Emit `?` and collect the values as bind parameters.
    Parameterized,
}

/// Stateless SQL renderer for one [`Mode`].
///
/// ```rust
/// use sql_helper::prelude::*;
///
/// let values = ColumnValues::new().with("a", 1).with("b", RowValues::Null);
/// let literal = SqlBuilder::literal().insert("t", &values).unwrap();
/// assert_eq!(literal.query, "insert into t (a, b) values (1, null)");
///
/// let prepared = SqlBuilder::parameterized().insert("t", &values).unwrap();
/// assert_eq!(prepared.query, "insert into t (a, b) values (?, ?)");
/// assert_eq!(prepared.params, vec![RowValues::Int(1), RowValues::Null]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SqlBuilder {
    mode: Mode,
}

impl SqlBuilder {
    #[must_use]
    pub const fn new(mode: Mode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn literal() -> Self {
        Self::new(Mode::Literal)
    }

    #[must_use]
    pub const fn parameterized() -> Self {
        Self::new(Mode::Parameterized)
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Render `value` as the right-hand side of a comparison or assignment, pushing it onto
    /// `params` in parameterized mode.
    fn operand(&self, value: &RowValues, params: &mut Vec<RowValues>) -> Result<String> {
        match value {
            RowValues::Expr(Expression::Scalar(sql)) => Ok(sql.clone()),
            RowValues::Expr(other) => Err(unsupported_expression(other)),
            _ => match self.mode {
                Mode::Literal => value_literal(value),
                Mode::Parameterized => {
                    params.push(value.clone());
                    Ok("?".to_string())
                }
            },
        }
    }

    /// Render a `where ...` clause; an empty condition list yields an empty string.
    ///
    /// # Errors
    ///
    /// `ArgumentShapeError` for malformed conditions, `UnsupportedType` for values with no
    /// literal form, and any safety check failure on column names or the finished clause.
    pub fn where_clause<I>(&self, conditions: I) -> Result<QueryAndParams>
    where
        I: IntoIterator,
        I::Item: Into<Option<Condition>>,
    {
        where_clause::render(self, conditions)
    }

    /// Render an `order by ...` clause; blank entries are dropped.
    ///
    /// # Errors
    ///
    /// Fails when the assembled clause does not pass the safety check.
    pub fn order<I, S>(&self, fields: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        select::order(fields)
    }
}

/// Render a host value as a SQL literal.
///
/// ```rust
/// use sql_helper::prelude::*;
///
/// assert_eq!(sql_helper::builder::value(&RowValues::Null).unwrap(), "null");
/// assert_eq!(sql_helper::builder::value(&"A's".into()).unwrap(), "'A''s'");
/// assert_eq!(
///     sql_helper::builder::value(&Expression::expr("sysdate").into()).unwrap(),
///     "sysdate"
/// );
/// ```
///
/// # Errors
///
/// `UnsupportedType` for booleans, temporal values, blobs, JSON, non-finite floats and
/// non-scalar expressions.
pub fn value(value: &RowValues) -> Result<String> {
    value_literal(value)
}

fn value_literal(value: &RowValues) -> Result<String> {
    match value {
        RowValues::Null => Ok("null".to_string()),
        RowValues::Int(i) => Ok(i.to_string()),
        RowValues::BigInt(i) => Ok(i.to_string()),
        RowValues::HugeInt(i) => Ok(i.to_string()),
        RowValues::Decimal(d) => Ok(d.to_string()),
        RowValues::Float(f) if f.is_finite() => Ok(f.to_string()),
        RowValues::Text(s) => Ok(quote(s)),
        RowValues::Expr(Expression::Scalar(sql)) => Ok(sql.clone()),
        RowValues::Expr(other) => Err(unsupported_expression(other)),
        RowValues::Float(_)
        | RowValues::Bool(_)
        | RowValues::Date(_)
        | RowValues::Time(_)
        | RowValues::Timestamp(_)
        | RowValues::Instant(_)
        | RowValues::Blob(_)
        | RowValues::JSON(_) => Err(SqlHelperError::UnsupportedType(format!(
            "{} has no SQL literal form: {value:?}",
            value.kind()
        ))),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn unsupported_expression(expr: &Expression) -> SqlHelperError {
    SqlHelperError::UnsupportedType(format!("expression cannot be used as a value: {expr:?}"))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use super::*;

    #[test]
    fn literal_values() {
        assert_eq!(value(&1.into()).unwrap(), "1");
        assert_eq!(value(&1.2.into()).unwrap(), "1.2");
        assert_eq!(
            value(&9_999_999_999_999_999_999_i128.into()).unwrap(),
            "9999999999999999999"
        );
        let tiny = Decimal::from_str("0.0000000000000000000000009999").unwrap();
        assert_eq!(value(&tiny.into()).unwrap(), "0.0000000000000000000000009999");
        assert_eq!(value(&"sysdate".into()).unwrap(), "'sysdate'");
        assert_eq!(value(&"A's".into()).unwrap(), "'A''s'");
        assert_eq!(value(&Expression::expr("sysdate").into()).unwrap(), "sysdate");
    }

    #[test]
    fn values_without_literal_form_fail() {
        for v in [
            RowValues::Bool(true),
            RowValues::Blob(vec![1]),
            RowValues::Float(f64::NAN),
            RowValues::Expr(Expression::NotNull),
        ] {
            assert!(
                matches!(value(&v), Err(SqlHelperError::UnsupportedType(_))),
                "{v:?}"
            );
        }
    }
}
