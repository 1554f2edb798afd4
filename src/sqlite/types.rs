use std::sync::LazyLock;

use regex::Regex;
use rusqlite::types::Value;

use crate::binding::WireType;
use crate::driver::ColumnMeta;

static PRECISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d+)\s*(?:,\s*(-?\d+)\s*)?\)").expect("precision pattern is valid")
});

/// Describe a result column from its declared type. Expressions and declared types
/// outside the recognised names fall back to the storage class of a sample value.
pub fn column_meta(
    label: String,
    decl_type: Option<&str>,
    sample: Option<&Value>,
) -> ColumnMeta {
    match decl_type.and_then(from_decl_type) {
        Some((wire_type, precision, scale)) => {
            ColumnMeta::new(label, wire_type).with_precision(precision, scale)
        }
        None => ColumnMeta::new(label, from_sample(sample)),
    }
}

/// Map a declared column type onto a wire type, following `SQLite`'s affinity rules
/// with a few names singled out. Only `NUMERIC` and `DECIMAL` count as exact numerics;
/// `None` for anything unrecognised (`uuid`, `json`, ...).
pub fn from_decl_type(decl: &str) -> Option<(WireType, i32, i32)> {
    let upper = decl.to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();

    let wire_type = match base {
        "TINYINT" => WireType::TINYINT,
        "SMALLINT" => WireType::SMALLINT,
        b if b.contains("INT") => WireType::BIGINT,
        b if b.contains("BOOL") => WireType::BOOLEAN,
        b if b.contains("DATETIME") || b.contains("TIMESTAMP") => WireType::TIMESTAMP,
        b if b.contains("DATE") => WireType::DATE,
        b if b.contains("TIME") => WireType::TIME,
        b if b.contains("CHAR") || b.contains("CLOB") || b.contains("TEXT") => {
            WireType::VARCHAR
        }
        b if b.contains("BLOB") => WireType::BLOB,
        b if b.contains("REAL") || b.contains("FLOA") || b.contains("DOUB") => WireType::DOUBLE,
        b if b.contains("DECIMAL") => WireType::DECIMAL,
        b if b.contains("NUMERIC") => WireType::NUMERIC,
        _ => return None,
    };

    let (precision, scale) = if wire_type.is_exact_numeric() {
        precision_and_scale(&upper)
    } else {
        (0, 0)
    };
    Some((wire_type, precision, scale))
}

fn from_sample(sample: Option<&Value>) -> WireType {
    match sample {
        Some(Value::Integer(_)) => WireType::BIGINT,
        Some(Value::Real(_)) => WireType::DOUBLE,
        Some(Value::Text(_)) => WireType::VARCHAR,
        Some(Value::Blob(_)) => WireType::BLOB,
        Some(Value::Null) | None => WireType::NULL,
    }
}

fn precision_and_scale(decl: &str) -> (i32, i32) {
    let Some(caps) = PRECISION.captures(decl) else {
        return (0, 0);
    };
    let precision = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let scale = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    (precision, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types() {
        let cases = [
            ("integer", WireType::BIGINT, 0, 0),
            ("SMALLINT", WireType::SMALLINT, 0, 0),
            ("varchar(40)", WireType::VARCHAR, 0, 0),
            ("DATETIME", WireType::TIMESTAMP, 0, 0),
            ("date", WireType::DATE, 0, 0),
            ("double precision", WireType::DOUBLE, 0, 0),
            ("NUMERIC(10, 2)", WireType::NUMERIC, 10, 2),
            ("decimal(30)", WireType::DECIMAL, 30, 0),
            ("numeric", WireType::NUMERIC, 0, 0),
            ("boolean", WireType::BOOLEAN, 0, 0),
        ];
        for (decl, wire_type, precision, scale) in cases {
            assert_eq!(from_decl_type(decl), Some((wire_type, precision, scale)), "{decl}");
        }
    }

    #[test]
    fn unknown_declarations_are_not_exact_numerics() {
        for decl in ["uuid", "JSON", "money", "geometry(point)"] {
            assert_eq!(from_decl_type(decl), None, "{decl}");
        }
        let text = Value::Text("6f1c".into());
        assert_eq!(
            column_meta("id".into(), Some("uuid"), Some(&text)).wire_type,
            WireType::VARCHAR
        );
        assert_eq!(
            column_meta("n".into(), Some("money"), Some(&Value::Real(1.5))).wire_type,
            WireType::DOUBLE
        );
        assert_eq!(column_meta("doc".into(), Some("json"), None).wire_type, WireType::NULL);
    }

    #[test]
    fn expressions_use_the_sample() {
        let meta = column_meta("n".into(), None, Some(&Value::Integer(3)));
        assert_eq!(meta.wire_type, WireType::BIGINT);
        assert_eq!(column_meta("x".into(), None, None).wire_type, WireType::NULL);
    }
}
