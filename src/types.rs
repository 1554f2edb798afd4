use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::expression::Expression;

/// Host values that can be rendered into SQL, bound as parameters, or decoded from a row.
///
/// The same enum is used on both sides of the wire so helper code never has to branch on
/// driver types:
/// ```rust
/// use sql_helper::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// NULL value
    Null,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// Integer wider than 64 bits; bound as exact text since drivers have no native type
    HugeInt(i128),
    /// Exact decimal
    Decimal(Decimal),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Wall-clock instant, bound as a UTC timestamp
    Instant(DateTime<Utc>),
    /// Binary data
    Blob(Vec<u8>),
    /// JSON value
    JSON(JsonValue),
    /// Raw SQL expression; rendered verbatim and never bound
    Expr(Expression),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for the integer, decimal and float variants.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::BigInt(_) | Self::HugeInt(_) | Self::Decimal(_) | Self::Float(_)
        )
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::HugeInt(_) => "hugeint",
            Self::Decimal(_) => "decimal",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Instant(_) => "instant",
            Self::Blob(_) => "blob",
            Self::JSON(_) => "json",
            Self::Expr(_) => "expression",
        }
    }

    /// Integer view of any integer variant that fits in an `i64`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(i64::from(*value)),
            Self::BigInt(value) => Some(*value),
            Self::HugeInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let RowValues::Bool(value) = self {
            return Some(*value);
        } else if let Some(i) = self.as_int() {
            if i == 1 {
                return Some(true);
            } else if i == 0 {
                return Some(false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(value) => Some(*value),
            Self::Int(value) => Some(Decimal::from(*value)),
            Self::BigInt(value) => Some(Decimal::from(*value)),
            Self::HugeInt(value) => Decimal::try_from_i128_with_scale(*value, 0).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowValues::Timestamp(value) => Some(*value),
            RowValues::Instant(value) => Some(value.naive_utc()),
            RowValues::Date(value) => value.and_hms_opt(0, 0, 0),
            RowValues::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// Parse the timestamp layouts drivers commonly hand back as text.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

macro_rules! row_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::$variant(value)
                }
            }
        )*
    };
}

row_value_from! {
    i32 => Int,
    i64 => BigInt,
    i128 => HugeInt,
    Decimal => Decimal,
    f64 => Float,
    String => Text,
    bool => Bool,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => Instant,
    Vec<u8> => Blob,
    JsonValue => JSON,
    Expression => Expr,
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<u64> for RowValues {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => RowValues::BigInt(v),
            Err(_) => RowValues::HugeInt(i128::from(value)),
        }
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_the_narrowest_variant() {
        assert_eq!(RowValues::from(1), RowValues::Int(1));
        assert_eq!(RowValues::from(1_i64), RowValues::BigInt(1));
        assert_eq!(
            RowValues::from(u64::MAX),
            RowValues::HugeInt(i128::from(u64::MAX))
        );
        assert_eq!(RowValues::from(None::<i32>), RowValues::Null);
        assert_eq!(RowValues::from("x"), RowValues::Text("x".into()));
    }

    #[test]
    fn timestamp_accessor_understands_text() {
        let v = RowValues::Text("2024-02-03 04:05:06".into());
        let ts = v.as_timestamp().unwrap();
        assert_eq!(ts.to_string(), "2024-02-03 04:05:06");
        assert!(RowValues::Text("nope".into()).as_timestamp().is_none());
    }

    #[test]
    fn bool_accessor_accepts_zero_and_one() {
        assert_eq!(RowValues::BigInt(1).as_bool(), Some(true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
    }
}
