//! Persistence layer error types

use thiserror::Error;

use crate::domain::TokenError;

/// SQLite primary result codes that mean "someone else holds the lock"
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Errors that can occur in the persistence layer
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store cannot be opened, reached, or a transaction cannot start
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The exclusive lock could not be taken in time, or the selected row
    /// vanished before it could be removed. Nothing was changed.
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// A value offered to the pool is not a valid token
    #[error("Invalid token at position {index}: {source}")]
    InvalidToken {
        index: usize,
        #[source]
        source: TokenError,
    },

    /// Provisioning request larger than one batch may be
    #[error("Cannot provision {requested} tokens at once, the limit is {max}")]
    TooManyTokens { requested: usize, max: usize },

    /// Table or column name that cannot be used as a bare SQL identifier
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

impl PersistenceError {
    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::TransactionConflict(_)
        )
    }

    /// Short label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "unavailable",
            Self::TransactionConflict(_) => "conflict",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TooManyTokens { .. } => "too_many_tokens",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::Duplicate(_) => "duplicate",
        }
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let primary_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);

                if matches!(primary_code, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
                    || is_lock_contention(db_err.message())
                {
                    Self::TransactionConflict(err.to_string())
                } else if db_err.is_unique_violation() {
                    Self::Duplicate(err.to_string())
                } else {
                    Self::StorageUnavailable(err.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => Self::StorageUnavailable(
                "timed out waiting for a database connection".to_string(),
            ),
            sqlx::Error::PoolClosed => {
                Self::StorageUnavailable("connection pool is closed".to_string())
            }
            _ => Self::StorageUnavailable(err.to_string()),
        }
    }
}

fn is_lock_contention(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
}
