use std::collections::VecDeque;
use std::rc::Rc;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Value;

use crate::binding::Bind;
use crate::driver::{ColumnMeta, Execution, RawStatement};
use crate::error::{Result, SqlHelperError};
use crate::types::parse_timestamp;

use super::params::Params;
use super::types::column_meta;

struct Buffered {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Value>>,
}

/// A statement handle on a shared `SQLite` connection.
///
/// Query results are read out of `SQLite` in full on execution; the cursor then walks
/// the buffered rows.
pub struct SqliteStatement {
    conn: Rc<rusqlite::Connection>,
    result: Option<Buffered>,
    current: Option<Vec<Value>>,
    batch: Vec<(String, Vec<Bind>)>,
    closed: bool,
}

impl SqliteStatement {
    pub(crate) fn new(conn: Rc<rusqlite::Connection>) -> Self {
        Self {
            conn,
            result: None,
            current: None,
            batch: Vec::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(SqlHelperError::ResourceAlreadyReleased("statement"))
        } else {
            Ok(())
        }
    }

    fn value(&self, idx: usize) -> Result<&Value> {
        let row = self
            .current
            .as_ref()
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(row.get(idx).ok_or(rusqlite::Error::InvalidColumnIndex(idx))?)
    }

    fn label(&self, idx: usize) -> String {
        self.result
            .as_ref()
            .and_then(|r| r.columns.get(idx))
            .map(|c| c.label.clone())
            .unwrap_or_default()
    }

    fn mismatch(&self, idx: usize, value: &Value) -> SqlHelperError {
        rusqlite::Error::InvalidColumnType(idx, self.label(idx), value.data_type()).into()
    }

    fn run_update(&self, sql: &str, binds: &[Bind]) -> Result<u64> {
        let params = Params::convert(binds);
        let changed = self.conn.prepare_cached(sql)?.execute(params.as_params())?;
        u64::try_from(changed).map_err(SqlHelperError::driver)
    }

    fn parse<T>(&self, idx: usize, text: &str, parsed: Option<T>, what: &str) -> Result<T> {
        parsed.ok_or_else(|| {
            SqlHelperError::decode(self.label(idx), format!("'{text}' is not a {what}"))
        })
    }
}

impl RawStatement for SqliteStatement {
    fn execute_query(&mut self, sql: &str, binds: &[Bind]) -> Result<()> {
        self.ensure_open()?;
        self.result = None;
        self.current = None;

        let params = Params::convert(binds);
        let mut stmt = self.conn.prepare_cached(sql)?;
        let decls: Vec<(String, Option<String>)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
            .collect();
        let width = decls.len();

        let mut rows = VecDeque::new();
        let mut cursor = stmt.query(params.as_params())?;
        while let Some(row) = cursor.next()? {
            let values = (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.push_back(values);
        }
        drop(cursor);
        drop(stmt);

        let columns = decls
            .into_iter()
            .enumerate()
            .map(|(i, (name, decl))| {
                let sample = rows
                    .iter()
                    .map(|r| &r[i])
                    .find(|v| !matches!(v, Value::Null));
                column_meta(name, decl.as_deref(), sample)
            })
            .collect();
        tracing::trace!(rows = rows.len(), "sqlite query buffered");
        self.result = Some(Buffered { columns, rows });
        Ok(())
    }

    fn execute_update(&mut self, sql: &str, binds: &[Bind]) -> Result<u64> {
        self.ensure_open()?;
        self.result = None;
        self.current = None;
        self.run_update(sql, binds)
    }

    fn execute(&mut self, sql: &str, binds: &[Bind]) -> Result<Execution> {
        self.ensure_open()?;
        let returns_rows = self.conn.prepare_cached(sql)?.column_count() > 0;
        if returns_rows {
            self.execute_query(sql, binds).map(|()| Execution::Rows)
        } else {
            self.execute_update(sql, binds).map(Execution::Updated)
        }
    }

    fn prepare(&mut self, sql: &str) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.conn.prepare_cached(sql)?.parameter_count())
    }

    fn add_batch(&mut self, sql: &str, binds: &[Bind]) -> Result<()> {
        self.ensure_open()?;
        self.batch.push((sql.to_string(), binds.to_vec()));
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>> {
        self.ensure_open()?;
        let batch = std::mem::take(&mut self.batch);
        let counts = batch
            .iter()
            .map(|(sql, binds)| self.run_update(sql, binds))
            .collect::<Result<Vec<_>>>()?;
        tracing::trace!(statements = counts.len(), "sqlite batch executed");
        Ok(counts)
    }

    fn clear_batch(&mut self) -> Result<()> {
        self.batch.clear();
        Ok(())
    }

    fn columns(&self) -> Result<Vec<ColumnMeta>> {
        self.result
            .as_ref()
            .map(|r| r.columns.clone())
            .ok_or(SqlHelperError::ResourceAlreadyReleased("result"))
    }

    fn next_row(&mut self) -> Result<bool> {
        let result = self
            .result
            .as_mut()
            .ok_or(SqlHelperError::ResourceAlreadyReleased("result"))?;
        self.current = result.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn get_int(&self, idx: usize) -> Result<Option<i32>> {
        match self.get_long(idx)? {
            None => Ok(None),
            Some(i) => i32::try_from(i).map(Some).map_err(|_| {
                let message = format!("{i} does not fit a 32-bit integer");
                SqlHelperError::decode(self.label(idx), message)
            }),
        }
    }

    fn get_long(&self, idx: usize) -> Result<Option<i64>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(*i)),
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn get_double(&self, idx: usize) -> Result<Option<f64>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Real(f) => Ok(Some(*f)),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => Ok(Some(*i as f64)),
            other => Err(self.mismatch(idx, other)),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get_float(&self, idx: usize) -> Result<Option<f32>> {
        Ok(self.get_double(idx)?.map(|f| f as f32))
    }

    fn get_boolean(&self, idx: usize) -> Result<Option<bool>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(*i != 0)),
            Value::Text(s) => {
                let parsed = bool::from_str(&s.to_ascii_lowercase()).ok();
                self.parse(idx, s, parsed, "boolean").map(Some)
            }
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn get_string(&self, idx: usize) -> Result<Option<String>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(i.to_string())),
            Value::Real(f) => Ok(Some(f.to_string())),
            Value::Text(s) => Ok(Some(s.clone())),
            other @ Value::Blob(_) => Err(self.mismatch(idx, other)),
        }
    }

    fn get_exact(&self, idx: usize) -> Result<Option<String>> {
        self.get_string(idx)
    }

    fn get_bytes(&self, idx: usize) -> Result<Option<Vec<u8>>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Blob(b) => Ok(Some(b.clone())),
            Value::Text(s) => Ok(Some(s.clone().into_bytes())),
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn get_date(&self, idx: usize) -> Result<Option<NaiveDate>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Text(s) => {
                let parsed = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .or_else(|| parse_timestamp(s).map(|ts| ts.date()));
                self.parse(idx, s, parsed, "date").map(Some)
            }
            Value::Integer(secs) => {
                let parsed = DateTime::from_timestamp(*secs, 0).map(|dt| dt.date_naive());
                self.parse(idx, &secs.to_string(), parsed, "date").map(Some)
            }
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn get_time(&self, idx: usize) -> Result<Option<NaiveTime>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Text(s) => {
                let parsed = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                    .ok();
                self.parse(idx, s, parsed, "time").map(Some)
            }
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn get_timestamp(&self, idx: usize) -> Result<Option<NaiveDateTime>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Text(s) => self.parse(idx, s, parse_timestamp(s), "timestamp").map(Some),
            Value::Integer(secs) => {
                let parsed = DateTime::from_timestamp(*secs, 0).map(|dt| dt.naive_utc());
                self.parse(idx, &secs.to_string(), parsed, "timestamp").map(Some)
            }
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn close_result(&mut self) -> Result<()> {
        self.result = None;
        self.current = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_result()?;
        self.batch.clear();
        self.closed = true;
        Ok(())
    }
}
