//! Database error types
//!
//! Wraps sqlx errors into variants that carry a rollback classification:
//! connection-level failures are recoverable, data-level failures are
//! validation errors, anything else is treated conservatively.

use crate::error::ErrorClass;
use thiserror::Error;

/// Custom database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection or pool failure
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Constraint violation (unique, foreign key, check)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Data type mismatch or row decoding failure
    #[error("Data type error: {0}")]
    TypeError(String),

    /// Migration failure
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Transaction bookkeeping failure
    #[error("Transaction failed: {0}")]
    TransactionError(String),

    /// Unit of work exceeded its wall-clock budget
    #[error("Transaction exceeded its {timeout_ms}ms budget")]
    TransactionTimeout { timeout_ms: u64 },

    /// Query execution failure
    #[error("Query error: {0}")]
    QueryError(String),
}

impl DatabaseError {
    /// Rollback classification for this error
    pub fn class(&self) -> ErrorClass {
        match self {
            DatabaseError::ConnectionError(_) | DatabaseError::TransactionTimeout { .. } => {
                ErrorClass::Recoverable
            }
            DatabaseError::NotFound(_)
            | DatabaseError::ConstraintViolation(_)
            | DatabaseError::TypeError(_) => ErrorClass::Validation,
            DatabaseError::MigrationError(_) | DatabaseError::TransactionError(_) => {
                ErrorClass::System
            }
            DatabaseError::QueryError(_) => ErrorClass::Unknown,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }
}

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound("no matching row".to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() => {
                DatabaseError::ConstraintViolation(db.to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                DatabaseError::TypeError(format!("column not found: {col}"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::TypeError(format!("error decoding column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => DatabaseError::TypeError(format!("decode error: {source}")),
            sqlx::Error::Configuration(msg) => {
                DatabaseError::ConnectionError(format!("configuration error: {msg}"))
            }
            sqlx::Error::Io(err) => DatabaseError::ConnectionError(format!("io error: {err}")),
            sqlx::Error::PoolTimedOut => {
                DatabaseError::ConnectionError("pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => DatabaseError::ConnectionError("pool closed".to_string()),
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(err.to_string())
    }
}
