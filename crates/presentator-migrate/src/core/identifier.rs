//! Identifier validation and quoting for dynamically built SQL.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! store that interpolates one goes through these helpers. Values are always
//! bound.

use crate::error::{MigrateError, Result};

/// Maximum identifier length (MySQL allows 64, PostgreSQL 63 bytes).
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validate an identifier before it is interpolated into SQL.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers longer than [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier.
///
/// ```ignore
/// assert_eq!(quote_pg("Screen")?, "\"Screen\"");
/// ```
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a MySQL identifier using backticks.
///
/// ```ignore
/// assert_eq!(quote_mysql("Screen")?, "`Screen`");
/// ```
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote a SQLite identifier. SQLite accepts the standard double-quote form.
pub fn quote_sqlite(name: &str) -> Result<String> {
    quote_pg(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_pg() {
        assert_eq!(quote_pg("createdAt").unwrap(), "\"createdAt\"");
        assert_eq!(quote_pg("odd\"name").unwrap(), "\"odd\"\"name\"");
    }

    #[test]
    fn test_quote_mysql() {
        assert_eq!(quote_mysql("UserProjectRel").unwrap(), "`UserProjectRel`");
        assert_eq!(quote_mysql("odd`name").unwrap(), "`odd``name`");
    }

    #[test]
    fn test_quote_sqlite() {
        assert_eq!(quote_sqlite("_externalAuths").unwrap(), "\"_externalAuths\"");
    }

    #[test]
    fn test_rejects_empty_and_null_bytes() {
        assert!(validate_identifier("").is_err());
        assert!(quote_pg("users\0; DROP TABLE users").is_err());
        assert!(quote_mysql(&"x".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
        assert!(quote_mysql(&"x".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }
}
