//! Error types for the toilet radar.

use thiserror::Error;

/// Result type alias using the radar's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for radar operations.
///
/// Lookups by id that find nothing are not errors; repositories return
/// `Ok(None)` or `Ok(false)` instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The store could not be reached, or the call timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid input (coordinates, viewport, limits, enum values)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error was raised by input validation, before any store access.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }

    /// Whether this error indicates the store is unreachable or timed out.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

/// SQLSTATE class for connection exceptions.
const SQLSTATE_CONNECTION_CLASS: &str = "08";
/// SQLSTATE `query_canceled`, raised when `statement_timeout` fires.
const SQLSTATE_QUERY_CANCELED: &str = "57014";
/// SQLSTATE `admin_shutdown`.
const SQLSTATE_ADMIN_SHUTDOWN: &str = "57P01";

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        let unavailable = match &e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => true,
            sqlx::Error::Database(db) => db.code().as_deref().is_some_and(|code| {
                code.starts_with(SQLSTATE_CONNECTION_CLASS)
                    || code == SQLSTATE_QUERY_CANCELED
                    || code == SQLSTATE_ADMIN_SHUTDOWN
            }),
            _ => false,
        };

        if unavailable {
            Error::StoreUnavailable(e.to_string())
        } else {
            Error::Database(e)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("latitude out of range".to_string());
        assert_eq!(err.to_string(), "Invalid input: latitude out of range");
        assert!(err.is_invalid_input());
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_error_display_store_unavailable() {
        let err = Error::StoreUnavailable("timed out".to_string());
        assert_eq!(err.to_string(), "Store unavailable: timed out");
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing DATABASE_URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing DATABASE_URL");
    }

    #[test]
    fn test_pool_timeout_maps_to_store_unavailable() {
        let err: Error = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_pool_closed_maps_to_store_unavailable() {
        let err: Error = sqlx::Error::PoolClosed.into();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_io_error_maps_to_store_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: Error = sqlx::Error::Io(io).into();
        assert!(err.is_store_unavailable());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_row_not_found_stays_database_error() {
        let err: Error = sqlx::Error::RowNotFound.into();
        match err {
            Error::Database(sqlx::Error::RowNotFound) => {}
            other => panic!("Expected Database(RowNotFound), got {:?}", other),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
