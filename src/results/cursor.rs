use std::fmt;
use std::sync::Arc;

use crate::binding::{DecodePlan, TypeRegistry};
use crate::driver::RawStatement;
use crate::error::{Result, SqlHelperError};

use super::row::{LabelIndex, Row, label_index};

/// Callback run once when a cursor releases its statement.
pub type ReleaseHook = Box<dyn FnOnce() -> Result<()>>;

/// Access to the statement a cursor reads from.
///
/// The cursor never holds a borrow of the statement between calls, so a pooled statement
/// can stay inside its connection while other statements run.
pub trait StatementSlot {
    type Statement: RawStatement + ?Sized;

    /// Run `f` against the statement.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns, or a failure to reach the statement.
    fn with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self::Statement) -> Result<T>;
}

/// A statement owned directly by its cursor.
#[derive(Debug)]
pub struct OwnedStatement<S>(pub S);

impl<S: RawStatement> StatementSlot for OwnedStatement<S> {
    type Statement = S;

    fn with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T>,
    {
        f(&mut self.0)
    }
}

impl<S: RawStatement + ?Sized> StatementSlot for &mut S {
    type Statement = S;

    fn with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T>,
    {
        f(&mut **self)
    }
}

/// Lazy, forward-only iterator over an executed statement's result.
///
/// Column metadata is read once when the cursor opens and turned into a [`DecodePlan`];
/// each `next()` then advances the statement by one row and decodes it through that plan.
/// The statement's result is released exactly once: when the rows run out, when
/// [`ResultCursor::close`] is called, when reading a row fails, or when the cursor is
/// dropped. A released cursor yields nothing.
pub struct ResultCursor<P: StatementSlot> {
    slot: P,
    plan: DecodePlan,
    labels: Arc<Vec<String>>,
    index: LabelIndex,
    rownum: usize,
    closed: bool,
    on_release: Option<ReleaseHook>,
}

impl<P: StatementSlot> ResultCursor<P> {
    /// Open a cursor over the result the statement in `slot` currently holds.
    ///
    /// If the metadata cannot be read the cursor is released before the error is returned;
    /// a failure of that release is logged so the metadata error is the one reported.
    ///
    /// # Errors
    ///
    /// Driver failures while reading result metadata.
    pub fn open(
        slot: P,
        registry: &TypeRegistry,
        on_release: Option<ReleaseHook>,
    ) -> Result<Self> {
        let mut cursor = Self {
            slot,
            plan: registry.plan(&[]),
            labels: Arc::new(Vec::new()),
            index: label_index(&[]),
            rownum: 0,
            closed: false,
            on_release,
        };

        match cursor.slot.with(|stmt| stmt.columns()) {
            Ok(columns) => {
                let labels: Vec<String> = columns.iter().map(|c| c.label.clone()).collect();
                cursor.plan = registry.plan(&columns);
                cursor.index = label_index(&labels);
                cursor.labels = Arc::new(labels);
                tracing::trace!(columns = cursor.labels.len(), "cursor opened");
                Ok(cursor)
            }
            Err(err) => {
                if let Err(release_err) = cursor.release() {
                    tracing::warn!(error = %release_err, "failed to release unopened cursor");
                }
                Err(err)
            }
        }
    }

    /// Column labels in result order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn plan(&self) -> &DecodePlan {
        &self.plan
    }

    /// Number of rows produced so far.
    #[must_use]
    pub fn rownum(&self) -> usize {
        self.rownum
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the statement's result. Idempotent.
    ///
    /// # Errors
    ///
    /// Failure to close the result or from the release hook; the cursor counts as
    /// closed either way.
    pub fn close(&mut self) -> Result<()> {
        self.release()
    }

    /// Drain the remaining rows.
    ///
    /// # Errors
    ///
    /// The first row that fails to decode.
    pub fn collect_rows(mut self) -> Result<Vec<Row>> {
        self.by_ref().collect()
    }

    fn fetch(&mut self) -> Result<Option<Row>> {
        let plan = &self.plan;
        let labels = &self.labels;
        let values = self.slot.with(|stmt| {
            if stmt.next_row()? {
                plan.decode_row(&*stmt, labels).map(Some)
            } else {
                Ok(None)
            }
        })?;

        Ok(values.map(|values| {
            let row = Row::with_index(
                Arc::clone(&self.labels),
                Arc::clone(&self.index),
                values,
                self.rownum,
            );
            self.rownum += 1;
            row
        }))
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let closed = match self.slot.with(|stmt| stmt.close_result()) {
            // the owning connection already closed every statement
            Err(SqlHelperError::ResourceAlreadyReleased(_)) => Ok(()),
            other => other,
        };
        let released = self.on_release.take().map_or(Ok(()), |hook| hook());
        tracing::trace!(rows = self.rownum, "cursor released");
        closed.and(released)
    }
}

impl<P: StatementSlot> Iterator for ResultCursor<P> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        match self.fetch() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => self.release().err().map(Err),
            Err(err) => {
                if let Err(release_err) = self.release() {
                    tracing::warn!(error = %release_err, "failed to release cursor after error");
                }
                Some(Err(err))
            }
        }
    }
}

impl<P: StatementSlot> Drop for ResultCursor<P> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.release() {
                tracing::warn!(error = %err, "failed to release cursor on drop");
            }
        }
    }
}

impl<P: StatementSlot> fmt::Debug for ResultCursor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor")
            .field("labels", &self.labels)
            .field("rownum", &self.rownum)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
