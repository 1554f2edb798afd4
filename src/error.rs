use thiserror::Error;

/// Errors raised by the builder, the binding registry, the statement pool and result cursors.
///
/// Safety and shape errors are programmer errors: nothing in this crate retries them or
/// tries to sanitize the offending input. Driver failures are carried through untouched.
#[derive(Debug, Error)]
pub enum SqlHelperError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// Opaque failure reported by a foreign driver.
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),

    #[error("{kind} cannot contain (unquoted) {token}: {text}")]
    InjectionRisk {
        kind: FragmentKind,
        token: &'static str,
        text: String,
    },

    #[error("{0} is blank")]
    BlankExpression(FragmentKind),

    #[error("Unclosed quotation mark: {0}")]
    UnterminatedQuote(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Invalid argument shape: {0}")]
    ArgumentShapeError(String),

    #[error("Statement nesting level is too deep (max {max_depth})")]
    NestingTooDeep { max_depth: usize },

    #[error("Statement handle {0} is not occupied by this pool")]
    NotOwned(u64),

    #[error("Index out of bound: {index} (row has {len} columns)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown column label: {0}")]
    UnknownColumn(String),

    #[error("{0} already closed")]
    ResourceAlreadyReleased(&'static str),

    /// A column value could not be represented in the host type its decode action targets.
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

/// What a checked SQL fragment was supposed to be, used to word safety errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Expression,
    ObjectName,
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentKind::Expression => f.write_str("Expression"),
            FragmentKind::ObjectName => f.write_str("Object name"),
        }
    }
}

impl SqlHelperError {
    /// Wrap a foreign driver error without translating it.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SqlHelperError::Driver(Box::new(err))
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        SqlHelperError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// True for the errors raised by the SQL fragment safety check.
    #[must_use]
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            SqlHelperError::InjectionRisk { .. }
                | SqlHelperError::BlankExpression(_)
                | SqlHelperError::UnterminatedQuote(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SqlHelperError>;
