use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::DEFAULT_MAX_DEPTH;

/// Default wait for a connection to become available.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Options applied when a [`crate::Connection`] is opened.
///
/// Deserializable so they can live in an application's config file; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// How many statements may be occupied at once (live cursors plus the running one).
    pub max_nesting_depth: usize,
    /// Row-fetch hint passed to every statement.
    pub fetch_size: Option<u32>,
    /// How long opening the connection may wait on the database.
    pub login_timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            fetch_size: None,
            login_timeout: Some(DEFAULT_LOGIN_TIMEOUT),
        }
    }
}

impl ConnectionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::new()
    }

    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

/// Fluent builder for connection options.
///
/// ```rust
/// use std::time::Duration;
/// use sql_helper::ConnectionOptions;
///
/// let opts = ConnectionOptions::builder()
///     .max_nesting_depth(4)
///     .fetch_size(500)
///     .login_timeout(Duration::from_secs(5))
///     .finish();
/// assert_eq!(opts.max_nesting_depth, 4);
/// assert_eq!(opts.fetch_size, Some(500));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.opts.max_nesting_depth = depth;
        self
    }

    #[must_use]
    pub fn fetch_size(mut self, rows: u32) -> Self {
        self.opts.fetch_size = Some(rows);
        self
    }

    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.opts.login_timeout = Some(timeout);
        self
    }

    /// Wait indefinitely when opening.
    #[must_use]
    pub fn no_login_timeout(mut self) -> Self {
        self.opts.login_timeout = None;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionOptions {
        self.opts
    }
}
