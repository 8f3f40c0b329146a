//! Schema name validation, so a configured schema can be interpolated into
//! `SET LOCAL search_path` safely.

use radar_core::{Error, Result};

/// PostgreSQL identifier length limit.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Names that are never accepted as a toilet schema.
const RESERVED: &[&str] = &[
    "pg_catalog",
    "information_schema",
    "pg_toast",
    "select",
    "insert",
    "update",
    "delete",
    "drop",
    "create",
    "alter",
    "grant",
    "revoke",
    "truncate",
];

/// Validate a PostgreSQL schema name.
///
/// Accepts a letter or underscore followed by ASCII alphanumerics or
/// underscores, at most 63 characters, not a reserved name.
///
/// ```
/// use radar_db::validate_schema_name;
///
/// assert!(validate_schema_name("public").is_ok());
/// assert!(validate_schema_name("toilets_2025").is_ok());
/// assert!(validate_schema_name("1toilets").is_err());
/// assert!(validate_schema_name("a;drop").is_err());
/// ```
pub fn validate_schema_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Schema name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidInput(format!(
            "Schema name exceeds {} character limit: {} characters",
            MAX_IDENTIFIER_LEN,
            name.len()
        )));
    }

    if let Some(first) = name.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidInput(format!(
                "Schema name must start with a letter or underscore, found: '{}'",
                first
            )));
        }
    }

    if let Some(bad) = name
        .chars()
        .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
    {
        return Err(Error::InvalidInput(format!(
            "Schema name contains invalid character: '{}'",
            bad
        )));
    }

    if RESERVED.contains(&name.to_lowercase().as_str()) {
        return Err(Error::InvalidInput(format!(
            "Schema name '{}' is reserved",
            name
        )));
    }

    Ok(())
}
