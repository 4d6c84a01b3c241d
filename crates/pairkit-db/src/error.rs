//! # Database Error Types
//!
//! Error types for storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Error Propagation                              │
//! │                                                                     │
//! │  SQLite error (sqlx::Error)                                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  DbError (this module) ← categorizes; constraint names surface      │
//! │       │                   in UniqueViolation::field                 │
//! │       ▼                                                             │
//! │  AuthError::Storage (pairkit-auth) ← logged, generic to callers;    │
//! │       │                              anticipated fingerprint-index  │
//! │       ▼                              hits become typed conflicts    │
//! │  Caller maps to a generic 5xx                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row not found where one was required.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// `field` carries the constraint text SQLite reports
    /// (e.g. `activation_codes.code` or `activation_codes.fingerprint`),
    /// which is how the service layer tells a code collision from a
    /// fingerprint conflict.
    #[error("duplicate {field}: value already exists")]
    UniqueViolation { field: String },

    /// Could not open or reach the database file.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Anything else from the driver.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when this is a unique violation on the named column
    /// (e.g. `"fingerprint"` matches `activation_codes.fingerprint`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { field } if field.rsplit('.').next() == Some(column)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// SQLite reports constraint hits as
/// `UNIQUE constraint failed: <table>.<column>`; the column path is kept so
/// callers can dispatch on which index fired.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;
