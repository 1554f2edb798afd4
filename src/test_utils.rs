//! In-memory scripted driver for exercising the pool, cursors and connection without a
//! database.
//!
//! Results are registered per SQL text; anything else executes successfully with an empty
//! result. Every driver clone shares the same [`MockState`], so a test can keep a handle on
//! the driver it gave to a [`crate::Connection`] and inspect what happened afterwards.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::binding::Bind;
use crate::driver::{ColumnMeta, Driver, Execution, RawStatement};
use crate::error::{Result, SqlHelperError};
use crate::types::RowValues;

/// A canned result: column metadata plus rows of host values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<RowValues>>,
}

impl MockResult {
    #[must_use]
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Everything the mock driver and its statements recorded.
#[derive(Debug, Default)]
pub struct MockState {
    pub results: HashMap<String, MockResult>,
    pub failing: HashSet<String>,
    pub update_counts: HashMap<String, u64>,
    pub executed: Vec<(String, Vec<Bind>)>,
    pub prepared: Vec<String>,
    /// Queues run by `execute_batch`, in order.
    pub batches: Vec<Vec<(String, Vec<Bind>)>>,
    pub cleared_batches: usize,
    pub created: usize,
    pub close_attempts: usize,
    pub closed_statements: usize,
    pub closed_results: usize,
    pub fetch_sizes: Vec<u32>,
    pub fail_close: bool,
    pub driver_closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `result`.
    #[must_use]
    pub fn with_result(self, sql: &str, result: MockResult) -> Self {
        self.state.borrow_mut().results.insert(sql.to_string(), result);
        self
    }

    /// Make `sql` fail at execution time.
    #[must_use]
    pub fn failing(self, sql: &str) -> Self {
        self.state.borrow_mut().failing.insert(sql.to_string());
        self
    }

    /// Affected row count reported for `sql`.
    #[must_use]
    pub fn with_update_count(self, sql: &str, count: u64) -> Self {
        self.state
            .borrow_mut()
            .update_counts
            .insert(sql.to_string(), count);
        self
    }

    #[must_use]
    pub fn state(&self) -> Ref<'_, MockState> {
        self.state.borrow()
    }

    #[must_use]
    pub fn state_mut(&self) -> RefMut<'_, MockState> {
        self.state.borrow_mut()
    }
}

impl Driver for MockDriver {
    type Statement = MockStatement;

    fn create_statement(&mut self) -> Result<MockStatement> {
        self.state.borrow_mut().created += 1;
        Ok(MockStatement {
            state: Rc::clone(&self.state),
            current: None,
            cursor: None,
            pending: Vec::new(),
            closed: false,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.state.borrow_mut().driver_closed = true;
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockStatement {
    state: Rc<RefCell<MockState>>,
    current: Option<MockResult>,
    cursor: Option<usize>,
    pending: Vec<(String, Vec<Bind>)>,
    closed: bool,
}

impl MockStatement {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(SqlHelperError::ResourceAlreadyReleased("statement"))
        } else {
            Ok(())
        }
    }

    fn run(&mut self, sql: &str, binds: &[Bind]) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.borrow_mut();
        state.executed.push((sql.to_string(), binds.to_vec()));
        if state.failing.contains(sql) {
            return Err(scripted_failure(sql));
        }
        Ok(())
    }

    fn update_count(&self, sql: &str) -> u64 {
        self.state
            .borrow()
            .update_counts
            .get(sql)
            .copied()
            .unwrap_or(0)
    }

    fn value(&self, idx: usize) -> Result<&RowValues> {
        let result = self
            .current
            .as_ref()
            .ok_or(SqlHelperError::ResourceAlreadyReleased("result"))?;
        let row = self
            .cursor
            .and_then(|pos| result.rows.get(pos))
            .ok_or_else(|| mismatch("no current row"))?;
        row.get(idx).ok_or(SqlHelperError::IndexOutOfRange {
            index: idx,
            len: row.len(),
        })
    }
}

fn scripted_failure(sql: &str) -> SqlHelperError {
    SqlHelperError::driver(std::io::Error::other(format!("scripted failure: {sql}")))
}

fn mismatch(message: impl Into<String>) -> SqlHelperError {
    SqlHelperError::driver(std::io::Error::other(message.into()))
}

fn read<T>(
    value: &RowValues,
    wanted: &str,
    convert: impl FnOnce(&RowValues) -> Option<T>,
) -> Result<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    convert(value)
        .map(Some)
        .ok_or_else(|| mismatch(format!("cannot read {} as {wanted}", value.kind())))
}

impl RawStatement for MockStatement {
    fn execute_query(&mut self, sql: &str, binds: &[Bind]) -> Result<()> {
        self.run(sql, binds)?;
        let result = self
            .state
            .borrow()
            .results
            .get(sql)
            .cloned()
            .unwrap_or_default();
        self.current = Some(result);
        self.cursor = None;
        Ok(())
    }

    fn execute_update(&mut self, sql: &str, binds: &[Bind]) -> Result<u64> {
        self.run(sql, binds)?;
        Ok(self.update_count(sql))
    }

    /// SQL with a registered result produces rows; anything else counts as an update.
    fn execute(&mut self, sql: &str, binds: &[Bind]) -> Result<Execution> {
        if self.state.borrow().results.contains_key(sql) {
            self.execute_query(sql, binds).map(|()| Execution::Rows)
        } else {
            self.execute_update(sql, binds).map(Execution::Updated)
        }
    }

    /// Counts `?` markers; quoting is not considered.
    fn prepare(&mut self, sql: &str) -> Result<usize> {
        self.ensure_open()?;
        let mut state = self.state.borrow_mut();
        if state.failing.contains(sql) {
            return Err(scripted_failure(sql));
        }
        state.prepared.push(sql.to_string());
        Ok(sql.matches('?').count())
    }

    fn add_batch(&mut self, sql: &str, binds: &[Bind]) -> Result<()> {
        self.ensure_open()?;
        self.pending.push((sql.to_string(), binds.to_vec()));
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>> {
        self.ensure_open()?;
        let pending = std::mem::take(&mut self.pending);
        self.state.borrow_mut().batches.push(pending.clone());
        let mut counts = Vec::with_capacity(pending.len());
        for (sql, binds) in &pending {
            counts.push(self.execute_update(sql, binds)?);
        }
        Ok(counts)
    }

    fn clear_batch(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pending.clear();
        self.state.borrow_mut().cleared_batches += 1;
        Ok(())
    }

    fn columns(&self) -> Result<Vec<ColumnMeta>> {
        self.current
            .as_ref()
            .map(|r| r.columns.clone())
            .ok_or(SqlHelperError::ResourceAlreadyReleased("result"))
    }

    fn next_row(&mut self) -> Result<bool> {
        let Some(result) = &self.current else {
            return Err(SqlHelperError::ResourceAlreadyReleased("result"));
        };
        let next = self.cursor.map_or(0, |pos| pos + 1);
        self.cursor = Some(next);
        Ok(next < result.rows.len())
    }

    fn get_int(&self, idx: usize) -> Result<Option<i32>> {
        read(self.value(idx)?, "int", |v| {
            v.as_int().and_then(|i| i32::try_from(i).ok())
        })
    }

    fn get_long(&self, idx: usize) -> Result<Option<i64>> {
        read(self.value(idx)?, "long", RowValues::as_int)
    }

    fn get_double(&self, idx: usize) -> Result<Option<f64>> {
        read(self.value(idx)?, "double", RowValues::as_float)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get_float(&self, idx: usize) -> Result<Option<f32>> {
        read(self.value(idx)?, "float", |v| v.as_float().map(|f| f as f32))
    }

    fn get_boolean(&self, idx: usize) -> Result<Option<bool>> {
        read(self.value(idx)?, "boolean", RowValues::as_bool)
    }

    fn get_string(&self, idx: usize) -> Result<Option<String>> {
        read(self.value(idx)?, "string", |v| match v {
            RowValues::Text(s) => Some(s.clone()),
            RowValues::Int(i) => Some(i.to_string()),
            RowValues::BigInt(i) => Some(i.to_string()),
            RowValues::HugeInt(i) => Some(i.to_string()),
            RowValues::Decimal(d) => Some(d.to_string()),
            RowValues::Float(f) => Some(f.to_string()),
            _ => None,
        })
    }

    fn get_exact(&self, idx: usize) -> Result<Option<String>> {
        read(self.value(idx)?, "exact numeral", |v| match v {
            RowValues::Text(s) => Some(s.clone()),
            RowValues::Int(i) => Some(i.to_string()),
            RowValues::BigInt(i) => Some(i.to_string()),
            RowValues::HugeInt(i) => Some(i.to_string()),
            RowValues::Decimal(d) => Some(d.to_string()),
            _ => None,
        })
    }

    fn get_bytes(&self, idx: usize) -> Result<Option<Vec<u8>>> {
        read(self.value(idx)?, "bytes", |v| v.as_blob().map(<[u8]>::to_vec))
    }

    fn get_date(&self, idx: usize) -> Result<Option<NaiveDate>> {
        read(self.value(idx)?, "date", |v| match v {
            RowValues::Date(d) => Some(*d),
            other => other.as_timestamp().map(|ts| ts.date()),
        })
    }

    fn get_time(&self, idx: usize) -> Result<Option<NaiveTime>> {
        read(self.value(idx)?, "time", |v| match v {
            RowValues::Time(t) => Some(*t),
            _ => None,
        })
    }

    fn get_timestamp(&self, idx: usize) -> Result<Option<NaiveDateTime>> {
        read(self.value(idx)?, "timestamp", RowValues::as_timestamp)
    }

    fn close_result(&mut self) -> Result<()> {
        if self.current.take().is_some() {
            self.state.borrow_mut().closed_results += 1;
        }
        self.cursor = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.close_attempts += 1;
        if state.fail_close {
            return Err(mismatch("scripted close failure"));
        }
        if !self.closed {
            self.closed = true;
            state.closed_statements += 1;
        }
        Ok(())
    }

    fn set_fetch_size(&mut self, rows: u32) {
        self.state.borrow_mut().fetch_sizes.push(rows);
    }
}
