use crate::condition::{ColumnConditions, Condition, ConditionValue, Shape};
use crate::error::{Result, SqlHelperError};
use crate::expression::{Expression, Op};
use crate::query::QueryAndParams;
use crate::safety;
use crate::types::RowValues;

use super::SqlBuilder;

pub(super) fn render<I>(builder: &SqlBuilder, conditions: I) -> Result<QueryAndParams>
where
    I: IntoIterator,
    I::Item: Into<Option<Condition>>,
{
    let mut parts = Vec::new();
    let mut params = Vec::new();

    for condition in conditions {
        let Some(condition) = condition.into() else {
            continue;
        };
        match condition.normalize()? {
            None => {}
            Some(Shape::Raw(sql)) => parts.push(format!("({sql})")),
            Some(Shape::Template(template, binds)) => {
                parts.push(format!(
                    "({})",
                    fill_template(builder, template, binds, &mut params)?
                ));
            }
            Some(Shape::Columns(map)) => {
                render_columns(builder, map, &mut parts, &mut params)?;
            }
        }
    }

    if parts.is_empty() {
        return Ok(QueryAndParams::default());
    }

    let clause = format!("where {}", parts.join(" and "));
    safety::check(&clause, false)?;
    Ok(QueryAndParams::new(clause, params))
}

fn render_columns(
    builder: &SqlBuilder,
    map: &ColumnConditions,
    parts: &mut Vec<String>,
    params: &mut Vec<RowValues>,
) -> Result<()> {
    for (column, value) in map.iter() {
        safety::check(column, true)?;
        let part = match value {
            ConditionValue::Null => format!("{column} is null"),
            ConditionValue::Scalar(v) => format!("{column} = {}", builder.operand(v, params)?),
            ConditionValue::RangeInclusive(lo, hi) => {
                let lo = builder.operand(lo, params)?;
                let hi = builder.operand(hi, params)?;
                format!("{column} >= {lo} and {column} <= {hi}")
            }
            ConditionValue::RangeExclusive(lo, hi) => {
                let lo = builder.operand(lo, params)?;
                let hi = builder.operand(hi, params)?;
                format!("{column} >= {lo} and {column} < {hi}")
            }
            // An empty set matches nothing.
            ConditionValue::Set(items) if items.is_empty() => "1 = 0".to_string(),
            ConditionValue::Set(items) => {
                let rendered = items
                    .iter()
                    .map(|item| builder.operand(item, params))
                    .collect::<Result<Vec<_>>>()?;
                format!("{column} in ({})", rendered.join(", "))
            }
            ConditionValue::Expression(Expression::Scalar(sql)) => format!("{column} = {sql}"),
            ConditionValue::Expression(Expression::NotNull) => format!("{column} is not null"),
            ConditionValue::Expression(Expression::Parameterized { op, value }) => {
                if matches!(op, Op::Like | Op::NotLike) {
                    check_pattern(column, value)?;
                }
                format!("{column} {} {}", op.as_sql(), builder.operand(value, params)?)
            }
        };
        parts.push(part);
    }
    Ok(())
}

/// `like` compares against text; a raw expression is trusted to produce some.
fn check_pattern(column: &str, value: &RowValues) -> Result<()> {
    match value {
        RowValues::Text(_) | RowValues::Expr(Expression::Scalar(_)) => Ok(()),
        other => Err(SqlHelperError::UnsupportedType(format!(
            "like on {column} needs a text pattern, got {}",
            other.kind()
        ))),
    }
}

/// Substitute the `?` placeholders of a template that sit outside quoted runs.
fn fill_template(
    builder: &SqlBuilder,
    template: &str,
    binds: &[RowValues],
    params: &mut Vec<RowValues>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut quote: Option<char> = None;
    let mut next = binds.iter();

    for ch in template.chars() {
        match (quote, ch) {
            (Some(open), c) if c == open => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'' | '"' | '`') => {
                quote = Some(ch);
                out.push(ch);
            }
            (None, '?') => {
                let bind = next.next().ok_or_else(|| {
                    SqlHelperError::ArgumentShapeError(format!(
                        "not enough bind values for template: {template}"
                    ))
                })?;
                out.push_str(&builder.operand(bind, params)?);
            }
            (None, c) => out.push(c),
        }
    }

    if next.next().is_some() {
        return Err(SqlHelperError::ArgumentShapeError(format!(
            "too many bind values for template: {template}"
        )));
    }
    Ok(out)
}
