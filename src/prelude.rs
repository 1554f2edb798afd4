//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_helper::prelude::*;
//!
//! let qp = sql_prepared::count("users", [Condition::columns([("active", true)])])?;
//! assert_eq!(qp.query, "select count(*) from users where active = ?");
//! # Ok::<(), SqlHelperError>(())
//! ```

pub use crate::binding::{DecodeAction, TypeRegistry, WireType};
pub use crate::builder::{Mode, SelectOptions, SqlBuilder};
pub use crate::condition::{ColumnConditions, ColumnMap, ColumnValues, Condition, ConditionValue};
pub use crate::config::ConnectionOptions;
pub use crate::connection::{Connection, Executed, PreparedStatement};
pub use crate::driver::{ColumnMeta, Driver, Execution, RawStatement};
pub use crate::error::SqlHelperError;
pub use crate::expression::{Expression, NOT_NULL, Op};
pub use crate::query::QueryAndParams;
pub use crate::results::{ResultCursor, Row};
pub use crate::types::RowValues;
pub use crate::{sql, sql_prepared};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
