//! Raw SQL expressions and comparison operators for where clauses.
//!
//! ```rust
//! use sql_helper::prelude::*;
//!
//! let clause = sql::where_clause([Condition::columns([
//!     ("created_at", ConditionValue::from(Expression::le(Expression::expr("sysdate")))),
//!     ("deleted_at", NOT_NULL.into()),
//! ])])
//! .unwrap();
//! assert_eq!(clause, "where created_at <= sysdate and deleted_at is not null");
//! ```

use std::hash::{Hash, Hasher};

use crate::types::RowValues;

/// Comparison operator carried by [`Expression::Parameterized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
    Like,
    NotLike,
}

impl Op {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Ne => "<>",
            Op::Like => "like",
            Op::NotLike => "not like",
        }
    }
}

/// A SQL snippet that is never quoted by the builder.
///
/// Two expressions are equal when they render to the same text.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Raw SQL text such as `sysdate` or `now()`.
    Scalar(String),
    /// `is not null`
    NotNull,
    /// `<op> <value>`; the value is bound in parameterized mode unless it is itself an
    /// expression.
    Parameterized { op: Op, value: Box<RowValues> },
}

/// Right-hand side accepted by [`Expression::like`] and [`Expression::not_like`].
pub trait LikePattern {
    fn into_operand(self) -> RowValues;
}

impl LikePattern for &str {
    fn into_operand(self) -> RowValues {
        RowValues::Text(self.to_string())
    }
}

impl LikePattern for String {
    fn into_operand(self) -> RowValues {
        RowValues::Text(self)
    }
}

impl LikePattern for Expression {
    fn into_operand(self) -> RowValues {
        RowValues::Expr(self)
    }
}

/// The `is not null` condition.
pub const NOT_NULL: Expression = Expression::NotNull;

impl Expression {
    /// Raw SQL snippet, rendered as-is.
    pub fn expr(sql: impl Into<String>) -> Self {
        Expression::Scalar(sql.into())
    }

    pub fn gt(value: impl Into<RowValues>) -> Self {
        Self::parameterized(Op::Gt, value)
    }

    pub fn lt(value: impl Into<RowValues>) -> Self {
        Self::parameterized(Op::Lt, value)
    }

    pub fn ge(value: impl Into<RowValues>) -> Self {
        Self::parameterized(Op::Ge, value)
    }

    pub fn le(value: impl Into<RowValues>) -> Self {
        Self::parameterized(Op::Le, value)
    }

    pub fn ne(value: impl Into<RowValues>) -> Self {
        Self::parameterized(Op::Ne, value)
    }

    /// `like` only takes a text pattern or a raw expression.
    pub fn like(pattern: impl LikePattern) -> Self {
        Self::parameterized(Op::Like, pattern.into_operand())
    }

    pub fn not_like(pattern: impl LikePattern) -> Self {
        Self::parameterized(Op::NotLike, pattern.into_operand())
    }

    fn parameterized(op: Op, value: impl Into<RowValues>) -> Self {
        Expression::Parameterized {
            op,
            value: Box::new(value.into()),
        }
    }

    /// Literal rendering: the raw text, `is not null`, or `<op> <literal>`.
    ///
    /// Parameterized expressions whose value has no literal form fall back to its debug
    /// representation; this is only used for equality and display.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Expression::Scalar(sql) => sql.clone(),
            Expression::NotNull => "is not null".to_string(),
            Expression::Parameterized { op, value } => {
                let rhs = crate::builder::value(value).unwrap_or_else(|_| format!("{value:?}"));
                format!("{} {rhs}", op.as_sql())
            }
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.to_sql() == other.to_sql()
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_sql().hash(state);
    }
}
