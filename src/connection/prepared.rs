use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::binding::{Bind, encode_all};
use crate::driver::{Driver, RawStatement};
use crate::error::{Result, SqlHelperError};
use crate::pool::HandleId;
use crate::results::ResultCursor;
use crate::types::RowValues;

use super::{Inner, Pin, PooledStatement, QueryCursor};

/// SQL compiled once and run repeatedly with different parameters.
///
/// Created by [`Connection::prepare`](super::Connection::prepare). The statement pins its
/// pool handle until [`PreparedStatement::close`] or drop. Running it again retires any
/// cursor still reading an earlier result; that cursor then reports
/// `ResourceAlreadyReleased` and ends.
pub struct PreparedStatement<D: Driver> {
    inner: Rc<RefCell<Inner<D>>>,
    id: HandleId,
    sql: String,
    parameter_count: usize,
    generation: Rc<Cell<u64>>,
    closed: Cell<bool>,
}

impl<D: Driver> PreparedStatement<D> {
    pub(super) fn new(
        inner: Rc<RefCell<Inner<D>>>,
        id: HandleId,
        sql: String,
        parameter_count: usize,
    ) -> Self {
        Self {
            inner,
            id,
            sql,
            parameter_count,
            generation: Rc::new(Cell::new(0)),
            closed: Cell::new(false),
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of `?` parameters the driver found in the SQL.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// `true` once this statement or its connection was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get() || self.inner.borrow().closed
    }

    /// Run the query with `params` bound in order.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` once closed, `ArgumentShapeError` when the number of
    /// parameters is wrong, `UnsupportedType` for values that cannot be bound, and driver
    /// failures.
    pub fn query(&self, params: &[RowValues]) -> Result<QueryCursor<D>> {
        let binds = self.binds(params)?;
        self.with_statement(|stmt| stmt.execute_query(&self.sql, &binds))?;
        tracing::debug!(id = %self.id, binds = binds.len(), "prepared query executed");

        let registry = Rc::clone(&self.inner.borrow().registry);
        let slot = PooledStatement {
            inner: Rc::clone(&self.inner),
            id: self.id,
            pin: Some(Pin {
                current: Rc::clone(&self.generation),
                expected: self.generation.get(),
            }),
        };
        // the handle stays pinned to this statement, so releasing the cursor returns nothing
        ResultCursor::open(slot, &registry, None)
    }

    /// Run the statement with `params`; returns the affected row count.
    ///
    /// # Errors
    ///
    /// As [`PreparedStatement::query`].
    pub fn update(&self, params: &[RowValues]) -> Result<u64> {
        let binds = self.binds(params)?;
        let affected = self.with_statement(|stmt| stmt.execute_update(&self.sql, &binds))?;
        tracing::debug!(id = %self.id, binds = binds.len(), affected, "prepared update executed");
        Ok(affected)
    }

    /// Queue one set of parameters for [`PreparedStatement::execute_batch`].
    ///
    /// # Errors
    ///
    /// As [`PreparedStatement::query`].
    pub fn add_batch(&self, params: &[RowValues]) -> Result<()> {
        let binds = self.binds(params)?;
        self.with_queue(|stmt| stmt.add_batch(&self.sql, &binds))
    }

    /// Run every queued parameter set; one affected row count per set.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` once closed, and the first driver failure.
    pub fn execute_batch(&self) -> Result<Vec<u64>> {
        let counts = self.with_statement(RawStatement::execute_batch)?;
        tracing::debug!(id = %self.id, statements = counts.len(), "prepared batch executed");
        Ok(counts)
    }

    /// Drop the queued parameter sets.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` once closed, and driver failures.
    pub fn clear_batch(&self) -> Result<()> {
        self.with_queue(RawStatement::clear_batch)
    }

    /// Give the handle back to the connection's pool. Idempotent; a no-op once the
    /// connection is closed.
    ///
    /// # Errors
    ///
    /// Failure to clear the handle's queued batch.
    pub fn close(&self) -> Result<()> {
        if self.closed.replace(true) {
            return Ok(());
        }
        self.retire_cursors();
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return Ok(());
        }
        inner.prepared.retain(|id| *id != self.id);
        let cleared = inner
            .pool
            .get_mut(self.id)
            .and_then(|stmt| stmt.close_result().and(stmt.clear_batch()));
        inner.pool.give(self.id)?;
        tracing::debug!(id = %self.id, "prepared statement closed");
        cleared
    }

    fn binds(&self, params: &[RowValues]) -> Result<Vec<Bind>> {
        if params.len() != self.parameter_count {
            return Err(SqlHelperError::ArgumentShapeError(format!(
                "'{}' takes {} parameters, got {}",
                self.sql,
                self.parameter_count,
                params.len()
            )));
        }
        encode_all(params)
    }

    fn retire_cursors(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// Execute against the pinned handle, retiring earlier cursors first.
    fn with_statement<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut D::Statement) -> Result<T>,
    {
        self.ensure_open()?;
        self.retire_cursors();
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        f(inner.pool.get_mut(self.id)?)
    }

    /// Touch only the batch queue; live cursors stay valid.
    fn with_queue<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut D::Statement) -> Result<()>,
    {
        self.ensure_open()?;
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        f(inner.pool.get_mut(self.id)?)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.get() {
            Err(SqlHelperError::ResourceAlreadyReleased("prepared statement"))
        } else {
            Ok(())
        }
    }
}

impl<D: Driver> Drop for PreparedStatement<D> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(id = %self.id, error = %err, "failed to close prepared statement");
        }
    }
}

impl<D: Driver> fmt::Debug for PreparedStatement<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("id", &self.id)
            .field("sql", &self.sql)
            .field("parameter_count", &self.parameter_count)
            .field("closed", &self.closed.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::binding::{Bind, WireType};
    use crate::config::ConnectionOptions;
    use crate::connection::Connection;
    use crate::driver::ColumnMeta;
    use crate::test_utils::{MockDriver, MockResult};

    use super::*;

    const FIND: &str = "select n from t where a = ? and b = ?";
    const TOUCH: &str = "update t set seen = 1 where a = ?";

    fn driver() -> MockDriver {
        MockDriver::new()
            .with_result(
                FIND,
                MockResult::new(vec![ColumnMeta::new("n", WireType::INTEGER)])
                    .row([1])
                    .row([2]),
            )
            .with_update_count(TOUCH, 3)
    }

    fn connect(driver: &MockDriver, max_depth: usize) -> Connection<MockDriver> {
        Connection::new(
            driver.clone(),
            ConnectionOptions::default().with_max_nesting_depth(max_depth),
        )
    }

    #[test]
    fn runs_repeatedly_on_one_handle() {
        let driver = driver();
        let conn = connect(&driver, 20);
        let find = conn.prepare(FIND).unwrap();
        assert_eq!(find.parameter_count(), 2);
        assert_eq!(find.sql(), FIND);
        assert_eq!(conn.occupied_statements(), 1);

        for a in 0..3 {
            let rows = find
                .query(&[RowValues::BigInt(a), RowValues::from("x")])
                .unwrap()
                .collect_rows()
                .unwrap();
            assert_eq!(rows.len(), 2);
        }
        assert_eq!(driver.state().created, 1);
        assert_eq!(driver.state().prepared, vec![FIND.to_string()]);
        let (sql, binds) = driver.state().executed.last().cloned().unwrap();
        assert_eq!(sql, FIND);
        assert_eq!(binds, vec![Bind::Long(2), Bind::Text("x".into())]);
        // the pinned handle is not returned when a cursor ends
        assert_eq!(conn.occupied_statements(), 1);

        let touch = conn.prepare(TOUCH).unwrap();
        assert_eq!(touch.update(&[RowValues::BigInt(1)]).unwrap(), 3);
        assert_eq!(conn.occupied_statements(), 2);
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let driver = driver();
        let conn = connect(&driver, 20);
        let touch = conn.prepare(TOUCH).unwrap();
        assert!(matches!(
            touch.update(&[]),
            Err(SqlHelperError::ArgumentShapeError(_))
        ));
        assert!(matches!(
            touch.add_batch(&[RowValues::Int(1), RowValues::Int(2)]),
            Err(SqlHelperError::ArgumentShapeError(_))
        ));
        assert!(driver.state().executed.is_empty());
    }

    #[test]
    fn running_again_retires_the_previous_cursor() {
        let driver = driver();
        let conn = connect(&driver, 20);
        let find = conn.prepare(FIND).unwrap();
        let params = [RowValues::Int(1), RowValues::Int(2)];

        let mut first = find.query(&params).unwrap();
        assert!(first.next().unwrap().is_ok());
        let second = find.query(&params).unwrap();
        assert!(matches!(
            first.next(),
            Some(Err(SqlHelperError::ResourceAlreadyReleased("result")))
        ));
        assert!(first.next().is_none());
        drop(first);
        // the stale cursor's release left the new result alone
        assert_eq!(second.collect_rows().unwrap().len(), 2);
    }

    #[test]
    fn prepared_statements_count_against_the_nesting_limit() {
        let driver = driver();
        let conn = connect(&driver, 1);
        let find = conn.prepare(FIND).unwrap();
        assert!(matches!(
            conn.prepare(TOUCH),
            Err(SqlHelperError::NestingTooDeep { max_depth: 1 })
        ));
        find.close().unwrap();
        assert_eq!(conn.occupied_statements(), 0);
        assert!(conn.prepare(TOUCH).is_ok());
    }

    #[test]
    fn failed_prepare_returns_the_handle() {
        let driver = driver().failing("bad ?");
        let conn = connect(&driver, 1);
        assert!(matches!(conn.prepare("bad ?"), Err(SqlHelperError::Driver(_))));
        assert_eq!(conn.occupied_statements(), 0);
        assert_eq!(conn.open_statements(), 1);
    }

    #[test]
    fn batches_run_and_clear() {
        let driver = driver();
        let conn = connect(&driver, 20);
        let touch = conn.prepare(TOUCH).unwrap();
        touch.add_batch(&[RowValues::Int(1)]).unwrap();
        touch.add_batch(&[RowValues::Int(2)]).unwrap();
        assert_eq!(touch.execute_batch().unwrap(), vec![3, 3]);
        assert_eq!(driver.state().batches[0].len(), 2);
        assert!(touch.execute_batch().unwrap().is_empty());

        touch.add_batch(&[RowValues::Int(3)]).unwrap();
        touch.clear_batch().unwrap();
        assert!(touch.execute_batch().unwrap().is_empty());
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let driver = driver();
        let conn = connect(&driver, 20);
        let find = conn.prepare(FIND).unwrap();
        let mut live = find.query(&[RowValues::Int(1), RowValues::Int(2)]).unwrap();
        find.close().unwrap();
        find.close().unwrap();
        assert!(find.is_closed());
        assert!(matches!(
            find.query(&[RowValues::Int(1), RowValues::Int(2)]),
            Err(SqlHelperError::ResourceAlreadyReleased("prepared statement"))
        ));
        assert!(matches!(
            live.next(),
            Some(Err(SqlHelperError::ResourceAlreadyReleased(_)))
        ));
        assert_eq!(conn.occupied_statements(), 0);
        assert_eq!(conn.open_statements(), 1);
    }

    #[test]
    fn closing_the_connection_closes_prepared_statements() {
        let driver = driver();
        let conn = connect(&driver, 20);
        let touch = conn.prepare(TOUCH).unwrap();
        conn.close().unwrap();
        assert!(touch.is_closed());
        assert!(matches!(
            touch.update(&[RowValues::Int(1)]),
            Err(SqlHelperError::ResourceAlreadyReleased("connection"))
        ));
        touch.close().unwrap();
        drop(touch);
        assert_eq!(driver.state().closed_statements, 1);
    }
}
