//! Naive injection guard for raw SQL fragments.
//!
//! Quoted runs (`'...'`, `"..."`, `` `...` ``) are stripped first, so tokens inside string
//! literals or quoted identifiers never trip the check. Whatever is left must not contain
//! statement separators, comment markers or stray quote characters. Object names are held
//! to a stricter rule and may not contain parentheses either.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FragmentKind, Result, SqlHelperError};

static QUOTED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'[^']*'|"[^"]*"|`[^`]*`"#).expect("quoted-run pattern is valid")
});

static COMMENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--|/\*|\*/").expect("comment pattern is valid"));

/// Validate a SQL fragment, returning it unchanged on success.
///
/// ```rust
/// use sql_helper::safety::check;
///
/// assert_eq!(check("a = 'x; y'", false).unwrap(), "a = 'x; y'");
/// assert!(check("a = 1; drop table t", false).is_err());
/// assert!(check("count(*)", true).is_err());
/// ```
///
/// # Errors
///
/// - `InjectionRisk` for an unquoted `;`, `--`, `/*` or `*/`, or (object names only) a
///   parenthesis.
/// - `UnterminatedQuote` when a quote character has no partner.
/// - `BlankExpression` when nothing but whitespace (or quoted runs) is left.
pub fn check(text: &str, is_identifier: bool) -> Result<&str> {
    let kind = if is_identifier {
        FragmentKind::ObjectName
    } else {
        FragmentKind::Expression
    };

    let stripped = QUOTED_RUN.replace_all(text, "");
    let rest = stripped.trim();

    if rest.contains(';') {
        return Err(injection(kind, "semi-colons", text));
    }
    if COMMENT_MARKER.is_match(rest) {
        return Err(injection(kind, "comments", text));
    }
    if rest.contains(['\'', '"', '`']) {
        return Err(SqlHelperError::UnterminatedQuote(text.to_string()));
    }
    if rest.is_empty() {
        return Err(SqlHelperError::BlankExpression(kind));
    }
    if is_identifier && rest.contains(['(', ')']) {
        return Err(injection(kind, "parentheses", text));
    }

    Ok(text)
}

/// Shorthand for `check(text, true)`.
///
/// # Errors
///
/// Same as [`check`].
pub fn check_identifier(text: &str) -> Result<&str> {
    check(text, true)
}

/// Shorthand for `check(text, false)`.
///
/// # Errors
///
/// Same as [`check`].
pub fn check_expression(text: &str) -> Result<&str> {
    check(text, false)
}

fn injection(kind: FragmentKind, token: &'static str, text: &str) -> SqlHelperError {
    SqlHelperError::InjectionRisk {
        kind,
        token,
        text: text.to_string(),
    }
}
