//! # Store Errors
//!
//! Backend failures surfaced by `record`, `get_stats` and friends.
//! Transport-level failures (pool exhausted, connection refused, statement
//! timeout) are folded into [`StoreError::Unavailable`] so callers can tell
//! "try later" apart from "the data is wrong".

use thiserror::Error;

use crate::config::ConfigError;

/// Postgres SQLSTATE for `query_canceled`, raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";

/// Errors from the census tally store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached or did not answer in time.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected or failed a query.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Embedded schema migrations failed to apply.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored data violates a tally invariant (negative count, empty label).
    #[error("corrupt tally data: {0}")]
    Corrupt(String),

    /// Store configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Whether the failure means the backend is unreachable or timed out.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Unavailable(err.to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_unavailable());
    }

    #[test]
    fn io_error_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StoreError::from(sqlx::Error::Io(io));
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn row_not_found_is_database_error() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn corrupt_message() {
        let err = StoreError::Corrupt("negative count for France".into());
        assert_eq!(err.to_string(), "corrupt tally data: negative count for France");
    }

    #[test]
    fn config_error_is_transparent() {
        let err = StoreError::from(ConfigError::MissingDatabaseUrl);
        assert_eq!(err.to_string(), ConfigError::MissingDatabaseUrl.to_string());
    }
}
