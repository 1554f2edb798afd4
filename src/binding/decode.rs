use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::driver::{ColumnMeta, RawStatement};
use crate::error::{Result, SqlHelperError};
use crate::types::RowValues;

/// Vendor-neutral column type code, numerically identical to the standard SQL type codes
/// most drivers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireType(pub i32);

impl WireType {
    pub const BIT: WireType = WireType(-7);
    pub const TINYINT: WireType = WireType(-6);
    pub const SMALLINT: WireType = WireType(5);
    pub const INTEGER: WireType = WireType(4);
    pub const BIGINT: WireType = WireType(-5);
    pub const FLOAT: WireType = WireType(6);
    pub const REAL: WireType = WireType(7);
    pub const DOUBLE: WireType = WireType(8);
    pub const NUMERIC: WireType = WireType(2);
    pub const DECIMAL: WireType = WireType(3);
    pub const CHAR: WireType = WireType(1);
    pub const VARCHAR: WireType = WireType(12);
    pub const LONGVARCHAR: WireType = WireType(-1);
    pub const DATE: WireType = WireType(91);
    pub const TIME: WireType = WireType(92);
    pub const TIMESTAMP: WireType = WireType(93);
    pub const BINARY: WireType = WireType(-2);
    pub const VARBINARY: WireType = WireType(-3);
    pub const LONGVARBINARY: WireType = WireType(-4);
    pub const NULL: WireType = WireType(0);
    pub const OTHER: WireType = WireType(1111);
    pub const BLOB: WireType = WireType(2004);
    pub const CLOB: WireType = WireType(2005);
    pub const BOOLEAN: WireType = WireType(16);
    pub const NCHAR: WireType = WireType(-15);
    pub const NVARCHAR: WireType = WireType(-9);
    pub const LONGNVARCHAR: WireType = WireType(-16);
    pub const NCLOB: WireType = WireType(2011);

    /// True for the exact-numeric codes whose decode depends on precision and scale.
    #[must_use]
    pub fn is_exact_numeric(self) -> bool {
        self == WireType::NUMERIC || self == WireType::DECIMAL
    }
}

/// How one column of a result is read from the driver and turned into a host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeAction {
    Int,
    Long,
    /// Integer wider than 64 bits, read through the driver's exact text form.
    HugeInt,
    /// Exact decimal, read through the driver's exact text form.
    Decimal,
    Double,
    /// Single precision, widened to `f64`.
    Float,
    Boolean,
    Text,
    Bytes,
    Date,
    Time,
    Timestamp,
}

impl DecodeAction {
    /// Static decode table for non-exact codes; unknown codes read as text.
    #[must_use]
    pub fn for_wire_type(wire_type: WireType) -> Self {
        match wire_type {
            WireType::TINYINT | WireType::SMALLINT | WireType::INTEGER => DecodeAction::Int,
            WireType::BIGINT => DecodeAction::Long,
            WireType::REAL | WireType::DOUBLE => DecodeAction::Double,
            WireType::FLOAT => DecodeAction::Float,
            WireType::NUMERIC | WireType::DECIMAL => DecodeAction::Decimal,
            WireType::DATE => DecodeAction::Date,
            WireType::TIME => DecodeAction::Time,
            WireType::TIMESTAMP => DecodeAction::Timestamp,
            WireType::LONGVARBINARY | WireType::LONGNVARCHAR | WireType::BLOB => {
                DecodeAction::Bytes
            }
            WireType::BOOLEAN | WireType::BIT => DecodeAction::Boolean,
            _ => DecodeAction::Text,
        }
    }

    /// Pick the narrowest exact host type for a NUMERIC/DECIMAL column.
    ///
    /// A positive scale always decodes to [`DecodeAction::Decimal`]. With scale 0 the
    /// precision selects `i32` (up to 9 digits), `i64` (up to 18) or `i128`. A negative
    /// scale or unknown precision falls back to `Decimal`.
    #[must_use]
    pub fn for_exact_numeric(precision: i32, scale: i32) -> Self {
        match (precision, scale) {
            (_, s) if s > 0 => DecodeAction::Decimal,
            (1..=9, 0) => DecodeAction::Int,
            (10..=18, 0) => DecodeAction::Long,
            (19.., 0) => DecodeAction::HugeInt,
            _ => DecodeAction::Decimal,
        }
    }

    /// Read column `idx` of the statement's current row.
    ///
    /// # Errors
    ///
    /// Driver failures, and `Decode` when an exact value does not fit its target type.
    pub fn read<S>(self, stmt: &S, idx: usize, label: &str) -> Result<RowValues>
    where
        S: RawStatement + ?Sized,
    {
        let value = match self {
            DecodeAction::Int => stmt.get_int(idx)?.map(RowValues::Int),
            DecodeAction::Long => stmt.get_long(idx)?.map(RowValues::BigInt),
            DecodeAction::HugeInt => stmt
                .get_exact(idx)?
                .map(|text| parse_huge_int(label, &text).map(RowValues::HugeInt))
                .transpose()?,
            DecodeAction::Decimal => stmt
                .get_exact(idx)?
                .map(|text| parse_decimal(label, &text).map(RowValues::Decimal))
                .transpose()?,
            DecodeAction::Double => stmt.get_double(idx)?.map(RowValues::Float),
            DecodeAction::Float => stmt
                .get_float(idx)?
                .map(|f| RowValues::Float(f64::from(f))),
            DecodeAction::Boolean => stmt.get_boolean(idx)?.map(RowValues::Bool),
            DecodeAction::Text => stmt.get_string(idx)?.map(RowValues::Text),
            DecodeAction::Bytes => stmt.get_bytes(idx)?.map(RowValues::Blob),
            DecodeAction::Date => stmt.get_date(idx)?.map(RowValues::Date),
            DecodeAction::Time => stmt.get_time(idx)?.map(RowValues::Time),
            DecodeAction::Timestamp => stmt.get_timestamp(idx)?.map(RowValues::Timestamp),
        };
        Ok(value.unwrap_or(RowValues::Null))
    }
}

fn parse_decimal(label: &str, text: &str) -> Result<Decimal> {
    let text = text.trim();
    Decimal::from_str_exact(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| {
            SqlHelperError::decode(label, format!("'{text}' is not an exact decimal: {e}"))
        })
}

fn parse_huge_int(label: &str, text: &str) -> Result<i128> {
    let text = text.trim();
    if let Ok(value) = i128::from_str(text) {
        return Ok(value);
    }
    // Some drivers render integral NUMERICs with a zero fraction, e.g. "12.000".
    let decimal = parse_decimal(label, text)?;
    if decimal.fract().is_zero() {
        if let Some(value) = decimal.to_i128() {
            return Ok(value);
        }
    }
    Err(SqlHelperError::decode(
        label,
        format!("'{text}' does not fit a 128-bit integer"),
    ))
}

/// Decode table with optional per-vendor overrides.
///
/// ```rust
/// use sql_helper::binding::{DecodeAction, TypeRegistry, WireType};
/// use sql_helper::driver::ColumnMeta;
///
/// let registry = TypeRegistry::new().with_override(WireType::FLOAT, DecodeAction::Double);
/// let price = ColumnMeta::new("price", WireType::NUMERIC).with_precision(10, 2);
/// assert_eq!(registry.action_for(&price), DecodeAction::Decimal);
/// assert_eq!(
///     registry.action_for(&ColumnMeta::new("f", WireType::FLOAT)),
///     DecodeAction::Double
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeRegistry {
    overrides: HashMap<WireType, DecodeAction>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an override that wins over the static table, exact-numeric codes included.
    #[must_use]
    pub fn with_override(mut self, wire_type: WireType, action: DecodeAction) -> Self {
        self.overrides.insert(wire_type, action);
        self
    }

    #[must_use]
    pub fn action_for(&self, meta: &ColumnMeta) -> DecodeAction {
        if let Some(action) = self.overrides.get(&meta.wire_type) {
            return *action;
        }
        if meta.wire_type.is_exact_numeric() {
            DecodeAction::for_exact_numeric(meta.precision, meta.scale)
        } else {
            DecodeAction::for_wire_type(meta.wire_type)
        }
    }

    /// Build the plan for one execution's result.
    #[must_use]
    pub fn plan(&self, columns: &[ColumnMeta]) -> DecodePlan {
        DecodePlan(columns.iter().map(|meta| self.action_for(meta)).collect())
    }
}

/// Per-column decode actions for one executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodePlan(Vec<DecodeAction>);

impl DecodePlan {
    #[must_use]
    pub fn actions(&self) -> &[DecodeAction] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the statement's current row, one value per column.
    ///
    /// # Errors
    ///
    /// The first column that fails to decode.
    pub fn decode_row<S>(&self, stmt: &S, labels: &[String]) -> Result<Vec<RowValues>>
    where
        S: RawStatement + ?Sized,
    {
        self.0
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(idx, (action, label))| action.read(stmt, idx, label))
            .collect()
    }
}
