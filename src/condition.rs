//! Where-clause input: raw text, column mappings and `[template, bind...]` arrays.

use std::ops::{Range, RangeInclusive};

use crate::error::{Result, SqlHelperError};
use crate::expression::Expression;
use crate::types::RowValues;

/// Right-hand side of a column entry in a [`Condition::Columns`] mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// `col is null`
    Null,
    /// Any non-null scalar (number, text, date, ...): `col = value`
    Scalar(RowValues),
    /// `col >= lo and col <= hi`
    RangeInclusive(RowValues, RowValues),
    /// `col >= lo and col < hi`
    RangeExclusive(RowValues, RowValues),
    /// `col in (...)`
    Set(Vec<RowValues>),
    /// Raw expression, `is not null`, or an explicit comparison operator
    Expression(Expression),
}

impl From<RowValues> for ConditionValue {
    fn from(value: RowValues) -> Self {
        match value {
            RowValues::Null => ConditionValue::Null,
            RowValues::Expr(expr) => ConditionValue::Expression(expr),
            other => ConditionValue::Scalar(other),
        }
    }
}

impl From<Expression> for ConditionValue {
    fn from(value: Expression) -> Self {
        ConditionValue::Expression(value)
    }
}

macro_rules! condition_value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ConditionValue {
                fn from(value: $ty) -> Self {
                    ConditionValue::from(RowValues::from(value))
                }
            }
        )*
    };
}

condition_value_from_scalar!(
    i32,
    i64,
    i128,
    u64,
    f64,
    bool,
    &str,
    String,
    rust_decimal::Decimal,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
);

impl<T: Into<RowValues>> From<Option<T>> for ConditionValue {
    fn from(value: Option<T>) -> Self {
        ConditionValue::from(RowValues::from(value))
    }
}

impl<T: Into<RowValues>> From<RangeInclusive<T>> for ConditionValue {
    fn from(range: RangeInclusive<T>) -> Self {
        let (lo, hi) = range.into_inner();
        ConditionValue::RangeInclusive(lo.into(), hi.into())
    }
}

impl<T: Into<RowValues>> From<Range<T>> for ConditionValue {
    fn from(range: Range<T>) -> Self {
        ConditionValue::RangeExclusive(range.start.into(), range.end.into())
    }
}

impl<T: Into<RowValues>> From<Vec<T>> for ConditionValue {
    fn from(items: Vec<T>) -> Self {
        ConditionValue::Set(items.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered `column -> value` pairs.
///
/// Rendering follows insertion order, so the same sequence of `with` calls always produces
/// byte-identical SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<V> {
    entries: Vec<(String, V)>,
}

/// Mapping used by where clauses.
pub type ColumnConditions = ColumnMap<ConditionValue>;

/// Mapping used by insert and update.
pub type ColumnValues = ColumnMap<RowValues>;

impl<V> ColumnMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry; a repeated column keeps its first position and takes the new value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<V>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<V>) {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = value;
        } else {
            self.entries.push((column, value));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }
}

impl<V> Default for ColumnMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, T> FromIterator<(K, T)> for ColumnMap<V>
where
    K: Into<String>,
    T: Into<V>,
{
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (column, value) in iter {
            map.insert(column, value);
        }
        map
    }
}

impl<K, V, T, const N: usize> From<[(K, T); N]> for ColumnMap<V>
where
    K: Into<String>,
    T: Into<V>,
{
    fn from(entries: [(K, T); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// One entry of a where clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Raw boolean SQL, wrapped in parentheses when rendered.
    Raw(String),
    /// `col <op> value` for each entry, joined with `and`.
    Columns(ColumnConditions),
    /// `[template, bind...]`: the first element must be the template text, the rest fill its
    /// `?` placeholders in order.
    Array(Vec<RowValues>),
    /// A bare value. Only text is a usable condition (it is treated as [`Condition::Raw`]);
    /// anything else is rejected with `ArgumentShapeError`.
    Value(RowValues),
}

impl Condition {
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    pub fn columns(map: impl Into<ColumnConditions>) -> Self {
        Condition::Columns(map.into())
    }

    /// Build a `[template, bind...]` condition.
    pub fn template<I, T>(template: impl Into<String>, binds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RowValues>,
    {
        let mut items = vec![RowValues::Text(template.into())];
        items.extend(binds.into_iter().map(Into::into));
        Condition::Array(items)
    }

    /// Normalize into one of the three accepted shapes, `None` when the entry renders to
    /// nothing.
    pub(crate) fn normalize(&self) -> Result<Option<Shape<'_>>> {
        match self {
            Condition::Raw(sql) => Ok(raw_shape(sql)),
            Condition::Columns(map) if map.is_empty() => Ok(None),
            Condition::Columns(map) => Ok(Some(Shape::Columns(map))),
            Condition::Array(items) => match items.split_first() {
                None => Ok(None),
                Some((RowValues::Text(template), binds)) => {
                    Ok(Some(Shape::Template(template, binds)))
                }
                Some((other, _)) => Err(SqlHelperError::ArgumentShapeError(format!(
                    "condition array must start with a template string, got {}",
                    other.kind()
                ))),
            },
            Condition::Value(RowValues::Text(sql)) => Ok(raw_shape(sql)),
            Condition::Value(RowValues::Null) => Ok(None),
            Condition::Value(other) => Err(SqlHelperError::ArgumentShapeError(format!(
                "condition must be a string, a column mapping or an array, got {}",
                other.kind()
            ))),
        }
    }
}

fn raw_shape(sql: &str) -> Option<Shape<'_>> {
    if sql.trim().is_empty() {
        None
    } else {
        Some(Shape::Raw(sql))
    }
}

pub(crate) enum Shape<'a> {
    Raw(&'a str),
    Columns(&'a ColumnConditions),
    Template(&'a str, &'a [RowValues]),
}

impl From<&str> for Condition {
    fn from(value: &str) -> Self {
        Condition::Raw(value.to_string())
    }
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        Condition::Raw(value)
    }
}

impl From<ColumnConditions> for Condition {
    fn from(value: ColumnConditions) -> Self {
        Condition::Columns(value)
    }
}

impl From<Vec<RowValues>> for Condition {
    fn from(value: Vec<RowValues>) -> Self {
        Condition::Array(value)
    }
}

impl From<RowValues> for Condition {
    fn from(value: RowValues) -> Self {
        Condition::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_map_keeps_insertion_order() {
        let map: ColumnConditions = ColumnMap::new().with("b", 1).with("a", 2).with("b", 3);
        let cols: Vec<_> = map.columns().collect();
        assert_eq!(cols, ["b", "a"]);
        assert_eq!(map.iter().next().unwrap().1, &ConditionValue::from(3));
    }

    #[test]
    fn ranges_and_sets_convert() {
        assert_eq!(
            ConditionValue::from(1..=10),
            ConditionValue::RangeInclusive(RowValues::Int(1), RowValues::Int(10))
        );
        assert_eq!(
            ConditionValue::from(1..10),
            ConditionValue::RangeExclusive(RowValues::Int(1), RowValues::Int(10))
        );
        assert_eq!(
            ConditionValue::from(vec!["a", "b"]),
            ConditionValue::Set(vec!["a".into(), "b".into()])
        );
        assert_eq!(ConditionValue::from(None::<i32>), ConditionValue::Null);
    }

    #[test]
    fn shapes_are_validated() {
        assert!(Condition::raw("  ").normalize().unwrap().is_none());
        assert!(Condition::Array(vec![]).normalize().unwrap().is_none());
        assert!(matches!(
            Condition::Array(vec![RowValues::Int(1)]).normalize(),
            Err(SqlHelperError::ArgumentShapeError(_))
        ));
        assert!(matches!(
            Condition::Value(RowValues::Int(5)).normalize(),
            Err(SqlHelperError::ArgumentShapeError(_))
        ));
        assert!(matches!(
            Condition::Value("a = 1".into()).normalize(),
            Ok(Some(Shape::Raw("a = 1")))
        ));
    }
}
