//! Type-path and table-path helpers.
//!
//! A type path addresses one named type of one contract account as
//! `account/type`; a short table path addresses one table of one contract
//! as `account/table`. Both are plain strings so they can key caches and
//! result maps directly.

/// Builds the `account/type` path for a contract type.
pub fn type_path(account: &str, type_name: &str) -> String {
    format!("{}/{}", account, type_name)
}

/// Builds the `account/table` path identifying a contract table.
pub fn short_table_path(code: &str, table: &str) -> String {
    format!("{}/{}", code, table)
}

/// Splits a type path back into `(account, type_name)`.
///
/// Returns `None` unless the path is exactly two non-empty segments.
pub fn parse_type_path(path: &str) -> Option<(&str, &str)> {
    let (account, type_name) = path.split_once('/')?;
    if account.is_empty() || type_name.is_empty() || type_name.contains('/') {
        return None;
    }
    Some((account, type_name))
}
