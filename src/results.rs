//! Query results: decoded rows and the cursor that produces them.

mod cursor;
mod row;

pub use cursor::{OwnedStatement, ReleaseHook, ResultCursor, StatementSlot};
pub use row::Row;
