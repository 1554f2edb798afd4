use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{Result, SqlHelperError};
use crate::expression::Expression;
use crate::types::RowValues;

/// A value ready to be set on a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Null,
    Int(i32),
    Long(i64),
    Decimal(Decimal),
    Double(f64),
    Boolean(bool),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

/// Map one host value to its bind.
///
/// ```rust
/// use sql_helper::binding::{encode, Bind};
/// use sql_helper::prelude::*;
///
/// assert_eq!(encode(&RowValues::BigInt(7)).unwrap(), Bind::Long(7));
/// assert_eq!(
///     encode(&RowValues::HugeInt(1 << 70)).unwrap(),
///     Bind::Text("1180591620717411303424".into())
/// );
/// ```
///
/// # Errors
///
/// `UnsupportedType` for `is not null` and operator expressions, which are not values.
pub fn encode(value: &RowValues) -> Result<Bind> {
    Ok(match value {
        RowValues::Null => Bind::Null,
        RowValues::Int(i) => Bind::Int(*i),
        RowValues::BigInt(i) => Bind::Long(*i),
        // No driver has an unbounded integer bind; exact digits survive as text.
        RowValues::HugeInt(i) => Bind::Text(i.to_string()),
        RowValues::Decimal(d) => Bind::Decimal(*d),
        RowValues::Float(f) => Bind::Double(*f),
        RowValues::Text(s) => Bind::Text(s.clone()),
        RowValues::Bool(b) => Bind::Boolean(*b),
        RowValues::Date(d) => Bind::Date(*d),
        RowValues::Time(t) => Bind::Time(*t),
        RowValues::Timestamp(ts) => Bind::Timestamp(*ts),
        RowValues::Instant(instant) => Bind::Timestamp(instant.naive_utc()),
        RowValues::Blob(bytes) => Bind::Bytes(bytes.clone()),
        RowValues::JSON(json) => Bind::Text(json.to_string()),
        RowValues::Expr(Expression::Scalar(sql)) => Bind::Text(sql.clone()),
        RowValues::Expr(other) => {
            return Err(SqlHelperError::UnsupportedType(format!(
                "expression cannot be bound as a parameter: {other}"
            )));
        }
    })
}

/// Map a parameter list, preserving order.
///
/// # Errors
///
/// The first [`encode`] failure.
pub fn encode_all(values: &[RowValues]) -> Result<Vec<Bind>> {
    values.iter().map(encode).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn scalars_map_to_their_bind() {
        assert_eq!(encode(&RowValues::Null).unwrap(), Bind::Null);
        assert_eq!(encode(&RowValues::Int(3)).unwrap(), Bind::Int(3));
        assert_eq!(encode(&RowValues::Float(0.5)).unwrap(), Bind::Double(0.5));
        assert_eq!(encode(&RowValues::Bool(true)).unwrap(), Bind::Boolean(true));
        assert_eq!(
            encode(&RowValues::Decimal(Decimal::new(12345, 3))).unwrap(),
            Bind::Decimal(Decimal::new(12345, 3))
        );
        assert_eq!(
            encode(&RowValues::Blob(vec![0, 1])).unwrap(),
            Bind::Bytes(vec![0, 1])
        );
    }

    #[test]
    fn instants_bind_as_utc_wall_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let Bind::Timestamp(ts) = encode(&RowValues::Instant(instant)).unwrap() else {
            panic!("expected a timestamp bind");
        };
        assert_eq!(ts.to_string(), "2024-05-06 07:08:09");
    }

    #[test]
    fn text_fallbacks() {
        assert_eq!(
            encode(&RowValues::JSON(json!({"a": 1}))).unwrap(),
            Bind::Text(r#"{"a":1}"#.into())
        );
        assert_eq!(
            encode(&RowValues::Expr(Expression::expr("now()"))).unwrap(),
            Bind::Text("now()".into())
        );
        assert!(matches!(
            encode(&RowValues::Expr(Expression::NotNull)),
            Err(SqlHelperError::UnsupportedType(_))
        ));
    }

    #[test]
    fn encode_all_keeps_order() {
        let binds = encode_all(&[1.into(), "b".into(), RowValues::Null]).unwrap();
        assert_eq!(binds, vec![Bind::Int(1), Bind::Text("b".into()), Bind::Null]);
    }
}
