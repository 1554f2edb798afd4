//! `SQLite` driver backed by `rusqlite`.
//!
//! Rows are read out of `SQLite` when a query executes and handed to the cursor one at a
//! time, so each statement handle owns its result outright and any number of them can be
//! open on the same connection.

mod params;
mod statement;
mod types;

use std::path::Path;
use std::rc::Rc;

use crate::config::ConnectionOptions;
use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::{Result, SqlHelperError};

pub use statement::SqliteStatement;

/// One `SQLite` database connection.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Option<Rc<rusqlite::Connection>>,
}

impl SqliteDriver {
    /// Open a database file, creating it if needed.
    ///
    /// The login timeout becomes `SQLite`'s busy timeout.
    ///
    /// # Errors
    ///
    /// Returns `SqlHelperError::SqliteError` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, options: &ConnectionOptions) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        if let Some(timeout) = options.login_timeout {
            conn.busy_timeout(timeout)?;
        }
        Ok(Self::from_connection(conn))
    }

    /// # Errors
    ///
    /// Returns `SqlHelperError::SqliteError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    #[must_use]
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Some(Rc::new(conn)),
        }
    }
}

impl Driver for SqliteDriver {
    type Statement = SqliteStatement;

    fn create_statement(&mut self) -> Result<SqliteStatement> {
        let conn = self
            .conn
            .as_ref()
            .ok_or(SqlHelperError::ResourceAlreadyReleased("sqlite connection"))?;
        Ok(SqliteStatement::new(Rc::clone(conn)))
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        match Rc::try_unwrap(conn) {
            Ok(conn) => conn
                .close()
                .map_err(|(_, err)| SqlHelperError::SqliteError(err)),
            // a statement outlived the pool; the connection closes when it drops
            Err(_) => Ok(()),
        }
    }
}

impl Connection<SqliteDriver> {
    /// Open a `SQLite` file as a nestable connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlHelperError::SqliteError` if the file cannot be opened.
    pub fn open_sqlite(path: impl AsRef<Path>, options: ConnectionOptions) -> Result<Self> {
        let driver = SqliteDriver::open(path, &options)?;
        Ok(Connection::new(driver, options))
    }

    /// # Errors
    ///
    /// Returns `SqlHelperError::SqliteError` if `SQLite` cannot allocate the database.
    pub fn sqlite_in_memory(options: ConnectionOptions) -> Result<Self> {
        Ok(Connection::new(SqliteDriver::open_in_memory()?, options))
    }
}
