//! Statement pool backing query nesting on a single connection.
//!
//! Each live cursor keeps its statement occupied, so iterating one query while running
//! another needs a second handle. Handles are recycled through the free set (most recently
//! returned first) and new ones are only created while the number of occupied handles is
//! below the nesting limit. Not thread-safe; a pool belongs to one connection.

use std::fmt;

use crate::driver::RawStatement;
use crate::error::{Result, SqlHelperError};

/// Default nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Pool-assigned identity of a statement handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt#{}", self.0)
    }
}

/// Free/occupied statement sets bounded by a maximum nesting depth.
pub struct StatementPool<S> {
    free: Vec<(HandleId, S)>,
    occupied: Vec<(HandleId, S)>,
    max_depth: usize,
    next_id: u64,
    closed: bool,
}

impl<S> fmt::Debug for StatementPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementPool")
            .field("free", &self.free.len())
            .field("occupied", &self.occupied.len())
            .field("max_depth", &self.max_depth)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<S: RawStatement> StatementPool<S> {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            free: Vec::new(),
            occupied: Vec::new(),
            max_depth,
            next_id: 0,
            closed: false,
        }
    }

    /// Occupy a handle, reusing a free one or creating one through `create`.
    ///
    /// # Errors
    ///
    /// - `ResourceAlreadyReleased` after [`StatementPool::close`].
    /// - `NestingTooDeep` when no handle is free and `max_depth` handles are occupied.
    /// - Whatever `create` returns.
    pub fn take<F>(&mut self, create: F) -> Result<HandleId>
    where
        F: FnOnce() -> Result<S>,
    {
        if self.closed {
            return Err(SqlHelperError::ResourceAlreadyReleased("statement pool"));
        }

        if let Some(entry) = self.free.pop() {
            let id = entry.0;
            self.occupied.push(entry);
            tracing::trace!(%id, occupied = self.occupied.len(), "reusing statement");
            return Ok(id);
        }

        if self.occupied.len() >= self.max_depth {
            return Err(SqlHelperError::NestingTooDeep {
                max_depth: self.max_depth,
            });
        }

        let stmt = create()?;
        let id = HandleId(self.next_id);
        self.next_id += 1;
        self.occupied.push((id, stmt));
        tracing::debug!(%id, occupied = self.occupied.len(), "created statement");
        Ok(id)
    }

    /// Move an occupied handle back to the free set.
    ///
    /// # Errors
    ///
    /// `NotOwned` when `id` is not currently occupied by this pool.
    pub fn give(&mut self, id: HandleId) -> Result<()> {
        let pos = self.position(id)?;
        let entry = self.occupied.remove(pos);
        self.free.push(entry);
        tracing::trace!(%id, occupied = self.occupied.len(), "statement returned");
        Ok(())
    }

    /// Borrow an occupied handle.
    ///
    /// # Errors
    ///
    /// `NotOwned` when `id` is not currently occupied by this pool.
    pub fn get_mut(&mut self, id: HandleId) -> Result<&mut S> {
        let pos = self.position(id)?;
        Ok(&mut self.occupied[pos].1)
    }

    /// Run `f` on a taken handle and give it back whether or not `f` succeeds.
    ///
    /// # Errors
    ///
    /// Errors from [`StatementPool::take`] or from `f`.
    pub fn with_scoped<C, F, T>(&mut self, create: C, f: F) -> Result<T>
    where
        C: FnOnce() -> Result<S>,
        F: FnOnce(&mut S) -> Result<T>,
    {
        let id = self.take(create)?;
        let result = self.get_mut(id).and_then(f);
        self.give(id)?;
        result
    }

    /// Apply a setting to every live handle, free or occupied.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut S),
    {
        for (_, stmt) in self.free.iter_mut().chain(self.occupied.iter_mut()) {
            f(stmt);
        }
    }

    /// Close every handle and refuse further `take` calls. Idempotent.
    ///
    /// A handle that fails to close is logged and skipped; the remaining handles are still
    /// closed.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for (id, mut stmt) in self.free.drain(..).chain(self.occupied.drain(..)) {
            if let Err(err) = stmt.close() {
                tracing::warn!(%id, error = %err, "failed to close statement");
            }
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.len() + self.occupied.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    fn position(&self, id: HandleId) -> Result<usize> {
        self.occupied
            .iter()
            .position(|(occupied, _)| *occupied == id)
            .ok_or(SqlHelperError::NotOwned(id.0))
    }
}

impl<S: RawStatement> Default for StatementPool<S> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::driver::Driver;
    use crate::test_utils::{MockDriver, MockStatement};

    use super::*;

    fn pool_and_driver(max_depth: usize) -> (StatementPool<MockStatement>, MockDriver) {
        (StatementPool::new(max_depth), MockDriver::new())
    }

    #[test]
    fn take_up_to_max_depth_then_fail() {
        let (mut pool, mut driver) = pool_and_driver(3);
        let mut ids = HashSet::new();
        for _ in 0..3 {
            ids.insert(pool.take(|| driver.create_statement()).unwrap());
        }
        assert_eq!(ids.len(), 3);
        assert!(matches!(
            pool.take(|| driver.create_statement()),
            Err(SqlHelperError::NestingTooDeep { max_depth: 3 })
        ));
        assert_eq!(driver.state().created, 3);
    }

    #[test]
    fn given_handles_are_reused_last_in_first_out() {
        let (mut pool, mut driver) = pool_and_driver(20);
        let a = pool.take(|| driver.create_statement()).unwrap();
        let b = pool.take(|| driver.create_statement()).unwrap();
        pool.give(a).unwrap();
        pool.give(b).unwrap();
        assert_eq!(pool.free_count(), 2);
        assert_eq!(pool.take(|| driver.create_statement()).unwrap(), b);
        assert_eq!(pool.take(|| driver.create_statement()).unwrap(), a);
        assert_eq!(driver.state().created, 2);
        assert_eq!(pool.occupied_count(), 2);
    }

    #[test]
    fn give_rejects_handles_that_are_not_occupied() {
        let (mut pool, mut driver) = pool_and_driver(20);
        let a = pool.take(|| driver.create_statement()).unwrap();
        pool.give(a).unwrap();
        assert!(matches!(pool.give(a), Err(SqlHelperError::NotOwned(0))));
        assert!(pool.get_mut(a).is_err());
        assert!(matches!(
            pool.give(HandleId(99)),
            Err(SqlHelperError::NotOwned(99))
        ));
    }

    #[test]
    fn scoped_use_gives_back_on_error() {
        let (mut pool, mut driver) = pool_and_driver(1);
        let res: Result<()> = pool.with_scoped(
            || driver.create_statement(),
            |_| Err(SqlHelperError::UnknownColumn("x".into())),
        );
        assert!(matches!(res, Err(SqlHelperError::UnknownColumn(_))));
        assert_eq!(pool.occupied_count(), 0);
        assert_eq!(pool.free_count(), 1);

        let n = pool
            .with_scoped(|| driver.create_statement(), |stmt| stmt.execute_update("x", &[]))
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let (mut pool, mut driver) = pool_and_driver(20);
        let a = pool.take(|| driver.create_statement()).unwrap();
        pool.take(|| driver.create_statement()).unwrap();
        pool.give(a).unwrap();

        pool.close();
        pool.close();
        assert!(pool.is_closed());
        assert!(pool.is_empty());
        assert_eq!(driver.state().closed_statements, 2);
        assert!(matches!(
            pool.take(|| driver.create_statement()),
            Err(SqlHelperError::ResourceAlreadyReleased(_))
        ));
    }

    #[test]
    fn close_keeps_going_after_a_failure() {
        let (mut pool, mut driver) = pool_and_driver(20);
        driver.state_mut().fail_close = true;
        pool.take(|| driver.create_statement()).unwrap();
        pool.take(|| driver.create_statement()).unwrap();
        pool.close();
        assert_eq!(driver.state().close_attempts, 2);
    }

    #[test]
    fn for_each_mut_reaches_free_and_occupied() {
        let (mut pool, mut driver) = pool_and_driver(20);
        let a = pool.take(|| driver.create_statement()).unwrap();
        pool.take(|| driver.create_statement()).unwrap();
        pool.give(a).unwrap();
        pool.for_each_mut(|stmt| stmt.set_fetch_size(50));
        assert_eq!(driver.state().fetch_sizes, vec![50, 50]);
    }
}
