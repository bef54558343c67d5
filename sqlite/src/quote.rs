//! Identifier quoting for generated SQL.
//!
//! Table and column names in this schema include characters such as `-`
//! (`content-type`), so every generated statement quotes them. Values are
//! always bound as parameters, never quoted.

use crate::error::{Result, SqliteError};

/// Quotes an identifier with backticks, doubling any embedded backtick.
///
/// Identifiers containing a NUL byte are rejected: SQLite would truncate
/// them.
///
/// # Examples
///
/// ```
/// use hypercube_sqlite::quote_identifier;
///
/// assert_eq!(quote_identifier("dataset").unwrap(), "`dataset`");
/// assert_eq!(quote_identifier("content-type").unwrap(), "`content-type`");
/// assert_eq!(quote_identifier("odd`name").unwrap(), "`odd``name`");
/// assert!(quote_identifier("bad\0name").is_err());
/// ```
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.contains('\0') {
        return Err(SqliteError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quotes each identifier and joins them with `", "`.
pub fn quote_list<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let quoted = names
        .into_iter()
        .map(quote_identifier)
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}
