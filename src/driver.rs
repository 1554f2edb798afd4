//! The seam between this crate and a concrete database driver.
//!
//! A [`Driver`] hands out raw statement handles; a [`RawStatement`] executes SQL text with
//! optional binds, reports result metadata once per execution and exposes typed getters
//! for the current row. Everything above this module (pool, cursor, connection) is written
//! against these traits only.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::binding::{Bind, WireType};
use crate::error::Result;

/// Result column metadata, read once per executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub label: String,
    pub wire_type: WireType,
    /// Declared precision; `0` when unknown.
    pub precision: i32,
    /// Declared scale; `0` when unknown.
    pub scale: i32,
}

impl ColumnMeta {
    pub fn new(label: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            label: label.into(),
            wire_type,
            precision: 0,
            scale: 0,
        }
    }

    #[must_use]
    pub fn with_precision(mut self, precision: i32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

/// What running SQL of unknown shape produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// A result is open on the statement and can be read with `next_row`.
    Rows,
    /// No result; the affected row count.
    Updated(u64),
}

/// A source of raw statement handles, typically one open database connection.
///
/// Drivers own their connection outright; live cursors keep the driver alive through a
/// shared handle, so neither the driver nor its statements may borrow anything.
pub trait Driver: 'static {
    type Statement: RawStatement + 'static;

    /// Open a new statement bound to this connection.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn create_statement(&mut self) -> Result<Self::Statement>;

    /// Close the underlying connection. Called once, after every statement was closed.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One raw statement handle.
///
/// Getters read column `idx` (0-based) of the current row and return `Ok(None)` for SQL
/// NULL. `get_exact` returns the exact numeral text of a NUMERIC/DECIMAL value so that no
/// precision is lost on the way out of the driver.
pub trait RawStatement {
    /// Execute a query, replacing any previous result of this handle.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn execute_query(&mut self, sql: &str, binds: &[Bind]) -> Result<()>;

    /// Execute a statement that produces no rows; returns the affected row count.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn execute_update(&mut self, sql: &str, binds: &[Bind]) -> Result<u64>;

    /// Execute SQL that may or may not produce rows.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn execute(&mut self, sql: &str, binds: &[Bind]) -> Result<Execution>;

    /// Compile `sql` ahead of execution and report how many parameters it takes.
    ///
    /// # Errors
    ///
    /// Driver failures, including SQL that does not compile.
    fn prepare(&mut self, sql: &str) -> Result<usize>;

    /// Queue a row-less statement for [`RawStatement::execute_batch`].
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn add_batch(&mut self, sql: &str, binds: &[Bind]) -> Result<()>;

    /// Run every queued statement in order and empty the queue; returns one affected row
    /// count per statement.
    ///
    /// # Errors
    ///
    /// The first statement that fails. The queue is emptied either way.
    fn execute_batch(&mut self) -> Result<Vec<u64>>;

    /// Drop every queued statement without running it.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn clear_batch(&mut self) -> Result<()>;

    /// Metadata of the current result's columns.
    ///
    /// # Errors
    ///
    /// Driver failures, or no result is open.
    fn columns(&self) -> Result<Vec<ColumnMeta>>;

    /// Advance to the next row; `false` once the result is exhausted.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn next_row(&mut self) -> Result<bool>;

    fn get_int(&self, idx: usize) -> Result<Option<i32>>;
    fn get_long(&self, idx: usize) -> Result<Option<i64>>;
    fn get_double(&self, idx: usize) -> Result<Option<f64>>;
    fn get_float(&self, idx: usize) -> Result<Option<f32>>;
    fn get_boolean(&self, idx: usize) -> Result<Option<bool>>;
    fn get_string(&self, idx: usize) -> Result<Option<String>>;
    fn get_exact(&self, idx: usize) -> Result<Option<String>>;
    fn get_bytes(&self, idx: usize) -> Result<Option<Vec<u8>>>;
    fn get_date(&self, idx: usize) -> Result<Option<NaiveDate>>;
    fn get_time(&self, idx: usize) -> Result<Option<NaiveTime>>;
    fn get_timestamp(&self, idx: usize) -> Result<Option<NaiveDateTime>>;

    /// Discard the current result, keeping the handle usable.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn close_result(&mut self) -> Result<()>;

    /// Destroy the handle.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn close(&mut self) -> Result<()>;

    /// Row-fetch hint; drivers without one ignore it.
    fn set_fetch_size(&mut self, _rows: u32) {}
}
