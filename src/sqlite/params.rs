use rusqlite::types::Value;

use crate::binding::Bind;

/// Convert a single bind to a rusqlite `Value`.
///
/// `SQLite` has no decimal or temporal storage class: decimals travel as their exact text,
/// and dates and times as ISO-8601 text, which `SQLite`'s date functions understand.
#[must_use]
pub fn bind_to_sqlite_value(bind: &Bind) -> Value {
    match bind {
        Bind::Null => Value::Null,
        Bind::Int(i) => Value::Integer(i64::from(*i)),
        Bind::Long(i) => Value::Integer(*i),
        Bind::Decimal(d) => Value::Text(d.to_string()),
        Bind::Double(f) => Value::Real(*f),
        Bind::Boolean(b) => Value::Integer(i64::from(*b)),
        Bind::Text(s) => Value::Text(s.clone()),
        Bind::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
        Bind::Time(t) => Value::Text(t.format("%H:%M:%S%.f").to_string()),
        Bind::Timestamp(ts) => Value::Text(ts.format("%F %T%.f").to_string()),
        Bind::Bytes(bytes) => Value::Blob(bytes.clone()),
    }
}

/// `SQLite` parameter container.
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(binds: &[Bind]) -> Self {
        Params(binds.iter().map(bind_to_sqlite_value).collect())
    }

    /// Borrow as rusqlite positional parameters.
    pub fn as_params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, Value>> {
        rusqlite::params_from_iter(self.0.iter())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn temporal_and_decimal_binds_become_text() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let time = NaiveTime::from_hms_milli_opt(3, 4, 5, 600).unwrap();
        assert_eq!(
            bind_to_sqlite_value(&Bind::Date(date)),
            Value::Text("2024-01-02".into())
        );
        assert_eq!(
            bind_to_sqlite_value(&Bind::Time(time)),
            Value::Text("03:04:05.600".into())
        );
        assert_eq!(
            bind_to_sqlite_value(&Bind::Timestamp(date.and_time(time))),
            Value::Text("2024-01-02 03:04:05.600".into())
        );
        assert_eq!(
            bind_to_sqlite_value(&Bind::Decimal(Decimal::new(-1050, 2))),
            Value::Text("-10.50".into())
        );
        assert_eq!(bind_to_sqlite_value(&Bind::Boolean(true)), Value::Integer(1));
    }
}
