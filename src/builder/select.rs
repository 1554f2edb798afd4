use crate::condition::Condition;
use crate::error::Result;
use crate::query::QueryAndParams;
use crate::safety;

use super::SqlBuilder;

/// Optional parts of a `select`.
///
/// ```rust
/// use sql_helper::prelude::*;
///
/// let opts = SelectOptions::new()
///     .project(["id", "upper(name) as name"])
///     .filter(Condition::raw("id > 10"))
///     .order(["id desc"]);
/// let qp = SqlBuilder::literal().select("users", &opts).unwrap();
/// assert_eq!(
///     qp.query,
///     "select id, upper(name) as name from users where (id > 10) order by id desc"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    project: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<String>,
}

impl SelectOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Projected expressions; `*` when none are given.
    #[must_use]
    pub fn project<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add one where condition; repeated calls are joined with `and`.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    #[must_use]
    pub fn order<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order.extend(fields.into_iter().map(Into::into));
        self
    }
}

pub(super) fn order<I, S>(fields: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let fields: Vec<String> = fields
        .into_iter()
        .filter(|f| !f.as_ref().trim().is_empty())
        .map(|f| f.as_ref().to_string())
        .collect();
    if fields.is_empty() {
        return Ok(String::new());
    }
    let clause = format!("order by {}", fields.join(", "));
    safety::check(&clause, false)?;
    Ok(clause)
}

/// Join the non-empty pieces with single spaces.
fn assemble(pieces: &[&str]) -> String {
    pieces
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl SqlBuilder {
    /// `select <project|*> from <table> <where> <order>`.
    ///
    /// # Errors
    ///
    /// Safety failures on the table, a projection, or the assembled statement, plus any
    /// where-clause error.
    pub fn select(&self, table: &str, options: &SelectOptions) -> Result<QueryAndParams> {
        safety::check(table, true)?;
        for column in &options.project {
            safety::check(column, false)?;
        }
        let project = if options.project.is_empty() {
            "*".to_string()
        } else {
            options.project.join(", ")
        };
        let filter = self.where_clause(options.conditions.iter().cloned())?;
        let order = order(&options.order)?;

        let sql = assemble(&["select", &project, "from", table, &filter.query, &order]);
        safety::check(&sql, false)?;
        Ok(QueryAndParams::new(sql, filter.params))
    }

    /// `select count(*) from <table> <where>`.
    ///
    /// # Errors
    ///
    /// Safety failures on the table or the statement, plus any where-clause error.
    pub fn count<I>(&self, table: &str, conditions: I) -> Result<QueryAndParams>
    where
        I: IntoIterator,
        I::Item: Into<Option<Condition>>,
    {
        self.filtered("select count(*) from", table, conditions)
    }

    /// `delete from <table> <where>`.
    ///
    /// # Errors
    ///
    /// Safety failures on the table or the statement, plus any where-clause error.
    pub fn delete<I>(&self, table: &str, conditions: I) -> Result<QueryAndParams>
    where
        I: IntoIterator,
        I::Item: Into<Option<Condition>>,
    {
        self.filtered("delete from", table, conditions)
    }

    fn filtered<I>(&self, head: &str, table: &str, conditions: I) -> Result<QueryAndParams>
    where
        I: IntoIterator,
        I::Item: Into<Option<Condition>>,
    {
        safety::check(table, true)?;
        let filter = self.where_clause(conditions)?;
        let sql = assemble(&[head, table, &filter.query]);
        safety::check(&sql, false)?;
        Ok(QueryAndParams::new(sql, filter.params))
    }
}
