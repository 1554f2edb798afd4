//! Safe SQL building and nestable statement execution.
//!
//! - [`sql`] and [`sql_prepared`] render `select`, `count`, `insert`, `update`, `delete` and
//!   where/order clauses from structured input, rejecting fragments that look like
//!   injection attempts ([`safety`]).
//! - [`binding`] maps host values onto driver binds and result columns back onto
//!   [`RowValues`], choosing the narrowest exact type for NUMERIC/DECIMAL columns.
//! - [`Connection`] runs queries through a bounded [`pool::StatementPool`] so a query can be
//!   issued while the rows of another are still being read.
//!
//! Databases plug in through the [`driver::Driver`] and [`driver::RawStatement`] traits;
//! a `SQLite` driver ships behind the default `sqlite` feature.

pub mod binding;
pub mod builder;
pub mod condition;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod expression;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod results;
pub mod safety;
pub mod sql;
pub mod sql_prepared;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use builder::{Mode, SelectOptions, SqlBuilder};
pub use condition::{ColumnConditions, ColumnMap, ColumnValues, Condition, ConditionValue};
pub use config::{ConnectionOptions, ConnectionOptionsBuilder};
pub use connection::{Connection, Executed, PooledStatement, PreparedStatement, QueryCursor};
pub use error::{Result, SqlHelperError};
pub use expression::{Expression, NOT_NULL, Op};
pub use query::QueryAndParams;
pub use results::{ResultCursor, Row};
pub use types::RowValues;
