use crate::types::RowValues;

/// A SQL string and its bound parameters bundled together.
///
/// Parameterized builder output: every `?` placeholder in `query` lines up, left to right,
/// with one entry of `params`.
/// ```rust
/// use sql_helper::prelude::*;
///
/// let qp = QueryAndParams::new(
///     "insert into t (id, name) values (?, ?)",
///     vec![RowValues::Int(1), RowValues::Text("alice".into())],
/// );
/// # let _ = qp;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    /// Create a new `QueryAndParams` with the given query string and parameters
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    /// Create a new `QueryAndParams` with no parameters
    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Split into the SQL text and its parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<RowValues>) {
        (self.query, self.params)
    }
}

impl PartialEq<&str> for QueryAndParams {
    fn eq(&self, other: &&str) -> bool {
        self.params.is_empty() && self.query == *other
    }
}
