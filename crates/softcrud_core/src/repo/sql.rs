//! Identifier guards for dynamically built SQL.

use crate::repo::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Returns `name` double-quoted for SQLite after checking it is a plain identifier.
pub(crate) fn quote_ident(name: &str) -> RepoResult<String> {
    if !IDENTIFIER_RE.is_match(name) {
        return Err(RepoError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// Quotes every name and joins them with `, `.
pub(crate) fn quote_ident_list(names: &[&str]) -> RepoResult<String> {
    let quoted = names
        .iter()
        .map(|name| quote_ident(name))
        .collect::<RepoResult<Vec<_>>>()?;
    Ok(quoted.join(", "))
}
