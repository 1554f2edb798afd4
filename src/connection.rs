//! Connection facade: one driver, one statement pool, nested cursors.
//!
//! Every query occupies a statement until its cursor is released, so a second query can
//! run while the rows of the first are still being read. The connection and its live
//! cursors share the driver through `Rc<RefCell<..>>`; nothing here is `Send`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::binding::{Bind, TypeRegistry, encode_all};
use crate::config::ConnectionOptions;
use crate::driver::{Driver, Execution, RawStatement};
use crate::error::{Result, SqlHelperError};
use crate::pool::{HandleId, StatementPool};
use crate::query::QueryAndParams;
use crate::results::{ReleaseHook, ResultCursor, Row, StatementSlot};

mod prepared;

pub use prepared::PreparedStatement;

/// Cursor returned by [`Connection::query`].
pub type QueryCursor<D> = ResultCursor<PooledStatement<D>>;

/// Outcome of [`Connection::execute`].
pub enum Executed<D: Driver> {
    Rows(QueryCursor<D>),
    Updated(u64),
}

impl<D: Driver> Executed<D> {
    #[must_use]
    pub fn into_rows(self) -> Option<QueryCursor<D>> {
        match self {
            Executed::Rows(cursor) => Some(cursor),
            Executed::Updated(_) => None,
        }
    }

    #[must_use]
    pub fn update_count(&self) -> Option<u64> {
        match self {
            Executed::Rows(_) => None,
            Executed::Updated(count) => Some(*count),
        }
    }
}

impl<D: Driver> fmt::Debug for Executed<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executed::Rows(cursor) => f.debug_tuple("Rows").field(cursor).finish(),
            Executed::Updated(count) => f.debug_tuple("Updated").field(count).finish(),
        }
    }
}

struct Inner<D: Driver> {
    driver: D,
    pool: StatementPool<D::Statement>,
    options: ConnectionOptions,
    registry: Rc<TypeRegistry>,
    /// Handle holding statements queued by [`Connection::add_batch`].
    batch: Option<HandleId>,
    /// Handles pinned by open prepared statements.
    prepared: Vec<HandleId>,
    closed: bool,
}

impl<D: Driver> Inner<D> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(SqlHelperError::ResourceAlreadyReleased("connection"))
        } else {
            Ok(())
        }
    }

    fn take_statement(&mut self) -> Result<HandleId> {
        let Inner {
            driver,
            pool,
            options,
            ..
        } = self;
        pool.take(|| new_statement(driver, options))
    }

    fn return_after_failure(&mut self, id: HandleId) {
        if let Err(err) = self.pool.give(id) {
            tracing::warn!(%id, error = %err, "failed to return statement");
        }
    }

    fn give_back(&mut self, id: HandleId) -> Result<()> {
        // closing the connection already reclaimed every statement
        if self.closed {
            return Ok(());
        }
        self.pool.give(id)
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.batch = None;
        self.prepared.clear();
        let occupied = self.pool.occupied_count();
        if occupied > 0 {
            tracing::warn!(occupied, "closing connection with live cursors");
        }
        self.pool.close();
        self.driver.close()
    }
}

impl<D: Driver> Drop for Inner<D> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "failed to close connection on drop");
        }
    }
}

fn new_statement<D: Driver>(driver: &mut D, options: &ConnectionOptions) -> Result<D::Statement> {
    let mut stmt = driver.create_statement()?;
    if let Some(rows) = options.fetch_size {
        stmt.set_fetch_size(rows);
    }
    Ok(stmt)
}

/// A database connection that supports nested queries.
///
/// ```rust
/// # #[cfg(feature = "sqlite")]
/// # fn main() -> Result<(), sql_helper::SqlHelperError> {
/// use sql_helper::prelude::*;
/// use sql_helper::sqlite::SqliteDriver;
///
/// let conn = Connection::new(SqliteDriver::open_in_memory()?, ConnectionOptions::default());
/// conn.update("create table t (id integer, name text)")?;
/// let row = ColumnValues::new().with("id", 1).with("name", "a");
/// conn.update_with(&sql_prepared::insert("t", &row)?)?;
///
/// for outer in conn.query("select id from t")? {
///     let outer = outer?;
///     let qp = sql_prepared::select(
///         "t",
///         &SelectOptions::new()
///             .project(["name"])
///             .filter(Condition::columns([("id", outer.get("id")?.clone())])),
///     )?;
///     let names = conn.query_with(&qp)?.collect_rows()?;
///     assert_eq!(names[0].get("name")?, &RowValues::Text("a".into()));
/// }
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "sqlite"))]
/// # fn main() {}
/// ```
pub struct Connection<D: Driver> {
    inner: Rc<RefCell<Inner<D>>>,
}

impl<D: Driver> Connection<D> {
    #[must_use]
    pub fn new(driver: D, options: ConnectionOptions) -> Self {
        Self::with_registry(driver, options, TypeRegistry::default())
    }

    /// Create a connection whose cursors decode through `registry`.
    #[must_use]
    pub fn with_registry(driver: D, options: ConnectionOptions, registry: TypeRegistry) -> Self {
        let pool = StatementPool::new(options.max_nesting_depth);
        Self {
            inner: Rc::new(RefCell::new(Inner {
                driver,
                pool,
                options,
                registry: Rc::new(registry),
                batch: None,
                prepared: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Run a query and return a lazy cursor over its rows.
    ///
    /// The statement stays occupied until the cursor is exhausted, closed or dropped.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`], `NestingTooDeep` when too many
    /// cursors are live, and driver failures.
    pub fn query(&self, sql: &str) -> Result<QueryCursor<D>> {
        self.run_query(sql, Vec::new())
    }

    /// Run a parameterized query.
    ///
    /// # Errors
    ///
    /// As [`Connection::query`], plus `UnsupportedType` for parameters that cannot be bound.
    pub fn query_with(&self, query: &QueryAndParams) -> Result<QueryCursor<D>> {
        self.run_query(&query.query, encode_all(&query.params)?)
    }

    /// Run a query and collect every row.
    ///
    /// # Errors
    ///
    /// As [`Connection::query_with`], plus decode failures.
    pub fn query_rows(&self, query: &QueryAndParams) -> Result<Vec<Row>> {
        self.query_with(query)?.collect_rows()
    }

    /// Run a statement that returns no rows; returns the affected row count.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`], `NestingTooDeep` when too many
    /// cursors are live, and driver failures.
    pub fn update(&self, sql: &str) -> Result<u64> {
        self.run_update(sql, &[])
    }

    /// Run a parameterized statement that returns no rows.
    ///
    /// # Errors
    ///
    /// As [`Connection::update`], plus `UnsupportedType` for parameters that cannot be bound.
    pub fn update_with(&self, query: &QueryAndParams) -> Result<u64> {
        self.run_update(&query.query, &encode_all(&query.params)?)
    }

    /// Run SQL whose shape is not known up front.
    ///
    /// A statement that produces rows comes back as [`Executed::Rows`] and keeps its
    /// statement occupied like [`Connection::query`]; anything else returns the affected row
    /// count and frees the statement at once.
    ///
    /// # Errors
    ///
    /// As [`Connection::query`].
    pub fn execute(&self, sql: &str) -> Result<Executed<D>> {
        self.run_execute(sql, &[])
    }

    /// Parameterized [`Connection::execute`].
    ///
    /// # Errors
    ///
    /// As [`Connection::execute`], plus `UnsupportedType` for parameters that cannot be
    /// bound.
    pub fn execute_with(&self, query: &QueryAndParams) -> Result<Executed<D>> {
        self.run_execute(&query.query, &encode_all(&query.params)?)
    }

    /// Queue a row-less statement for [`Connection::execute_batch`].
    ///
    /// The first queued statement occupies a pool handle until the batch is executed or
    /// cleared.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`], `NestingTooDeep` when the
    /// first statement finds no handle, and driver failures.
    pub fn add_batch(&self, sql: &str) -> Result<()> {
        self.queue_batch(sql, &[])
    }

    /// Queue a parameterized statement for [`Connection::execute_batch`].
    ///
    /// # Errors
    ///
    /// As [`Connection::add_batch`], plus `UnsupportedType` for parameters that cannot be
    /// bound.
    pub fn add_batch_with(&self, query: &QueryAndParams) -> Result<()> {
        self.queue_batch(&query.query, &encode_all(&query.params)?)
    }

    /// Run the queued statements, then the batches of every open prepared statement.
    /// Returns the sum of all affected row counts; `0` when nothing was queued.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`], and the first driver
    /// failure. The connection's own queue is emptied and its handle freed either way.
    pub fn execute_batch(&self) -> Result<u64> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        let Inner {
            pool,
            batch,
            prepared,
            ..
        } = &mut *inner;

        let mut total = 0;
        if let Some(id) = batch.take() {
            let counts = pool.get_mut(id).and_then(RawStatement::execute_batch);
            pool.give(id)?;
            total += counts?.iter().sum::<u64>();
        }
        for id in prepared.iter() {
            total += pool.get_mut(*id)?.execute_batch()?.iter().sum::<u64>();
        }
        tracing::debug!(total, "batch executed");
        Ok(total)
    }

    /// Drop the queued statements, including those of open prepared statements.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`], and driver failures.
    pub fn clear_batch(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        let Inner {
            pool,
            batch,
            prepared,
            ..
        } = &mut *inner;

        if let Some(id) = batch.take() {
            let cleared = pool.get_mut(id).and_then(RawStatement::clear_batch);
            pool.give(id)?;
            cleared?;
        }
        for id in prepared.iter() {
            pool.get_mut(*id)?.clear_batch()?;
        }
        Ok(())
    }

    /// Compile `sql` once for repeated execution with different parameters.
    ///
    /// The prepared statement pins one pool handle until it is closed or dropped, so it
    /// counts against the nesting limit.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`], `NestingTooDeep` when no
    /// handle is available, and driver failures such as SQL that does not compile.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<D>> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        let id = inner.take_statement()?;
        let parameter_count = match inner.pool.get_mut(id).and_then(|stmt| stmt.prepare(sql)) {
            Ok(count) => count,
            Err(err) => {
                inner.return_after_failure(id);
                return Err(err);
            }
        };
        inner.prepared.push(id);
        tracing::debug!(%id, sql, parameter_count, "statement prepared");
        Ok(PreparedStatement::new(
            Rc::clone(&self.inner),
            id,
            sql.to_string(),
            parameter_count,
        ))
    }

    /// Close every statement and the driver. Idempotent.
    ///
    /// # Errors
    ///
    /// Failure to close the driver.
    pub fn close(&self) -> Result<()> {
        self.inner.borrow_mut().shutdown()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Set the row-fetch hint on every current and future statement.
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyReleased` after [`Connection::close`].
    pub fn set_fetch_size(&self, rows: u32) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        inner.options.fetch_size = Some(rows);
        inner.pool.for_each_mut(|stmt| stmt.set_fetch_size(rows));
        Ok(())
    }

    #[must_use]
    pub fn options(&self) -> ConnectionOptions {
        self.inner.borrow().options.clone()
    }

    /// Statements currently held by live cursors.
    #[must_use]
    pub fn occupied_statements(&self) -> usize {
        self.inner.borrow().pool.occupied_count()
    }

    /// Statements created so far and not yet closed.
    #[must_use]
    pub fn open_statements(&self) -> usize {
        self.inner.borrow().pool.len()
    }

    fn run_query(&self, sql: &str, binds: Vec<Bind>) -> Result<QueryCursor<D>> {
        let (id, registry) = {
            let mut inner = self.inner.borrow_mut();
            inner.ensure_open()?;
            let id = inner.take_statement()?;
            let executed = inner
                .pool
                .get_mut(id)
                .and_then(|stmt| stmt.execute_query(sql, &binds));
            if let Err(err) = executed {
                inner.return_after_failure(id);
                return Err(err);
            }
            tracing::debug!(%id, sql, binds = binds.len(), "query executed");
            (id, Rc::clone(&inner.registry))
        };
        self.open_cursor(id, &registry)
    }

    fn run_execute(&self, sql: &str, binds: &[Bind]) -> Result<Executed<D>> {
        let (id, registry) = {
            let mut inner = self.inner.borrow_mut();
            inner.ensure_open()?;
            let id = inner.take_statement()?;
            let outcome = match inner.pool.get_mut(id).and_then(|stmt| stmt.execute(sql, binds)) {
                Ok(outcome) => outcome,
                Err(err) => {
                    inner.return_after_failure(id);
                    return Err(err);
                }
            };
            tracing::debug!(%id, sql, binds = binds.len(), ?outcome, "statement executed");
            match outcome {
                Execution::Updated(count) => {
                    inner.pool.give(id)?;
                    return Ok(Executed::Updated(count));
                }
                Execution::Rows => (id, Rc::clone(&inner.registry)),
            }
        };
        self.open_cursor(id, &registry).map(Executed::Rows)
    }

    /// Wrap an executed, occupied statement in a cursor that gives it back on release.
    fn open_cursor(&self, id: HandleId, registry: &TypeRegistry) -> Result<QueryCursor<D>> {
        let slot = PooledStatement {
            inner: Rc::clone(&self.inner),
            id,
            pin: None,
        };
        let owner = Rc::clone(&self.inner);
        let hook: ReleaseHook = Box::new(move || owner.borrow_mut().give_back(id));
        ResultCursor::open(slot, registry, Some(hook))
    }

    fn queue_batch(&self, sql: &str, binds: &[Bind]) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        let id = match inner.batch {
            Some(id) => id,
            None => {
                let id = inner.take_statement()?;
                inner.batch = Some(id);
                id
            }
        };
        inner.pool.get_mut(id)?.add_batch(sql, binds)?;
        tracing::trace!(%id, sql, "statement queued");
        Ok(())
    }

    fn run_update(&self, sql: &str, binds: &[Bind]) -> Result<u64> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        let Inner {
            driver,
            pool,
            options,
            ..
        } = &mut *inner;
        let affected = pool.with_scoped(
            || new_statement(driver, options),
            |stmt| stmt.execute_update(sql, binds),
        )?;
        tracing::debug!(sql, binds = binds.len(), affected, "update executed");
        Ok(affected)
    }
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Connection")
                .field("pool", &inner.pool)
                .field("options", &inner.options)
                .field("closed", &inner.closed)
                .finish(),
            Err(_) => f.debug_struct("Connection").finish_non_exhaustive(),
        }
    }
}

/// Generation check for cursors over a prepared statement's handle: executing the
/// prepared statement again, or closing it, retires every earlier cursor.
struct Pin {
    current: Rc<Cell<u64>>,
    expected: u64,
}

/// A statement that stays in its connection's pool while a cursor reads from it.
pub struct PooledStatement<D: Driver> {
    inner: Rc<RefCell<Inner<D>>>,
    id: HandleId,
    pin: Option<Pin>,
}

impl<D: Driver> PooledStatement<D> {
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl<D: Driver> StatementSlot for PooledStatement<D> {
    type Statement = D::Statement;

    fn with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut D::Statement) -> Result<T>,
    {
        if let Some(pin) = &self.pin {
            if pin.current.get() != pin.expected {
                return Err(SqlHelperError::ResourceAlreadyReleased("result"));
            }
        }
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        f(inner.pool.get_mut(self.id)?)
    }
}
