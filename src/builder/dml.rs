use crate::condition::{ColumnValues, Condition};
use crate::error::{Result, SqlHelperError};
use crate::query::QueryAndParams;
use crate::safety;

use super::SqlBuilder;

impl SqlBuilder {
    /// `insert into <table> (<cols>) values (<vals>)`.
    ///
    /// # Errors
    ///
    /// `ArgumentShapeError` when `values` is empty, `UnsupportedType` for values with no
    /// literal form in literal mode, and safety failures on names or the statement.
    pub fn insert(&self, table: &str, values: &ColumnValues) -> Result<QueryAndParams> {
        self.insert_with("insert", table, values)
    }

    /// `insert ignore into ...`
    ///
    /// # Errors
    ///
    /// Same as [`SqlBuilder::insert`].
    pub fn insert_ignore(&self, table: &str, values: &ColumnValues) -> Result<QueryAndParams> {
        self.insert_with("insert ignore", table, values)
    }

    /// `replace into ...`
    ///
    /// # Errors
    ///
    /// Same as [`SqlBuilder::insert`].
    pub fn replace(&self, table: &str, values: &ColumnValues) -> Result<QueryAndParams> {
        self.insert_with("replace", table, values)
    }

    /// `update <table> set <col> = <val>, ... <where>`; assignment binds come before the
    /// where-clause binds.
    ///
    /// # Errors
    ///
    /// `ArgumentShapeError` when `values` is empty, plus every error [`SqlBuilder::insert`]
    /// and [`SqlBuilder::where_clause`] can return.
    pub fn update<I>(
        &self,
        table: &str,
        values: &ColumnValues,
        conditions: I,
    ) -> Result<QueryAndParams>
    where
        I: IntoIterator,
        I::Item: Into<Option<Condition>>,
    {
        safety::check(table, true)?;
        if values.is_empty() {
            return Err(SqlHelperError::ArgumentShapeError(format!(
                "update of {table} needs at least one column"
            )));
        }

        let mut params = Vec::new();
        let mut assignments = Vec::with_capacity(values.len());
        for (column, value) in values.iter() {
            safety::check(column, true)?;
            assignments.push(format!("{column} = {}", self.operand(value, &mut params)?));
        }

        let filter = self.where_clause(conditions)?;
        params.extend(filter.params);

        let mut sql = format!("update {table} set {}", assignments.join(", "));
        if !filter.query.is_empty() {
            sql.push(' ');
            sql.push_str(&filter.query);
        }
        safety::check(&sql, false)?;
        Ok(QueryAndParams::new(sql, params))
    }

    fn insert_with(
        &self,
        verb: &str,
        table: &str,
        values: &ColumnValues,
    ) -> Result<QueryAndParams> {
        safety::check(table, true)?;
        if values.is_empty() {
            return Err(SqlHelperError::ArgumentShapeError(format!(
                "{verb} into {table} needs at least one column"
            )));
        }

        let mut params = Vec::new();
        let mut columns = Vec::with_capacity(values.len());
        let mut rendered = Vec::with_capacity(values.len());
        for (column, value) in values.iter() {
            columns.push(safety::check(column, true)?);
            rendered.push(self.operand(value, &mut params)?);
        }

        let sql = format!(
            "{verb} into {table} ({}) values ({})",
            columns.join(", "),
            rendered.join(", ")
        );
        safety::check(&sql, false)?;
        Ok(QueryAndParams::new(sql, params))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::expression::Expression;
    use crate::types::RowValues;

    use super::*;

    fn values() -> ColumnValues {
        ColumnValues::new()
            .with("a", 1)
            .with("b", "x's")
            .with("c", RowValues::Null)
            .with("d", Expression::expr("sysdate"))
    }

    #[test]
    fn insert_literal_and_prepared() {
        let lit = SqlBuilder::literal().insert("t", &values()).unwrap();
        assert_eq!(
            lit.query,
            "insert into t (a, b, c, d) values (1, 'x''s', null, sysdate)"
        );
        assert!(lit.params.is_empty());

        let prep = SqlBuilder::parameterized().insert("t", &values()).unwrap();
        assert_eq!(prep.query, "insert into t (a, b, c, d) values (?, ?, ?, sysdate)");
        assert_eq!(
            prep.params,
            vec![RowValues::Int(1), RowValues::from("x's"), RowValues::Null]
        );
    }

    #[test]
    fn insert_verbs() {
        let v = ColumnValues::new().with("a", 1);
        let b = SqlBuilder::literal();
        assert_eq!(
            b.insert_ignore("t", &v).unwrap(),
            "insert ignore into t (a) values (1)"
        );
        assert_eq!(b.replace("t", &v).unwrap(), "replace into t (a) values (1)");
    }

    #[test]
    fn insert_columns_zip_back_to_the_mapping() {
        let v = ColumnValues::new()
            .with("z", 3)
            .with("y", Decimal::new(1234, 2))
            .with("x", "w");
        let qp = SqlBuilder::parameterized().insert("t", &v).unwrap();
        let cols = qp
            .query
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(cols, _)| cols.split(", ").collect::<Vec<_>>())
            .unwrap();
        let rebuilt: ColumnValues = cols.into_iter().zip(qp.params).collect();
        assert_eq!(rebuilt, v);
    }

    #[test]
    fn insert_rejects_bad_input() {
        let b = SqlBuilder::literal();
        assert!(matches!(
            b.insert("t", &ColumnValues::new()),
            Err(SqlHelperError::ArgumentShapeError(_))
        ));
        assert!(matches!(
            b.insert("t", &ColumnValues::new().with("a", true)),
            Err(SqlHelperError::UnsupportedType(_))
        ));
        assert!(
            SqlBuilder::parameterized()
                .insert("t", &ColumnValues::new().with("a", true))
                .is_ok()
        );
        assert!(b.insert("t", &ColumnValues::new().with("a)", 1)).is_err());
        assert!(b.insert("t -- x", &ColumnValues::new().with("a", 1)).is_err());
    }

    #[test]
    fn update_binds_assignments_before_filter() {
        let v = ColumnValues::new()
            .with("a", 1)
            .with("b", Expression::expr("now()"));
        let cond = Condition::template("id = ?", [7]);

        let lit = SqlBuilder::literal()
            .update("t", &v, [cond.clone()])
            .unwrap();
        assert_eq!(lit.query, "update t set a = 1, b = now() where (id = 7)");

        let prep = SqlBuilder::parameterized().update("t", &v, [cond]).unwrap();
        assert_eq!(prep.query, "update t set a = ?, b = now() where (id = ?)");
        assert_eq!(prep.params, vec![RowValues::Int(1), RowValues::Int(7)]);

        let all = SqlBuilder::literal()
            .update("t", &ColumnValues::new().with("a", 2), Vec::<Condition>::new())
            .unwrap();
        assert_eq!(all, "update t set a = 2");
    }

    #[test]
    fn update_needs_assignments() {
        assert!(matches!(
            SqlBuilder::literal().update("t", &ColumnValues::new(), [Condition::raw("a = 1")]),
            Err(SqlHelperError::ArgumentShapeError(_))
        ));
    }
}
