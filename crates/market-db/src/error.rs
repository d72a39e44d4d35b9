//! # Database Error Types
//!
//! Storage faults and the combined error returned by inventory operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Categorized (busy, constraint, pool...)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InventoryError ← Domain(CoreError) | Storage(DbError)                 │
//! │       │                                                                 │
//! │       ├── is_retryable() → conflict retry loop                         │
//! │       ▼                                                                 │
//! │  kind() → ErrorKind handed to the request layer                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use market_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two concurrent first-adds of the same product to the same sale
    /// - Re-inserting a product or branch id
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Creating a sale for a non-existent branch
    /// - Restocking a non-existent product
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, bad status...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// SQLite reported SQLITE_BUSY or SQLITE_LOCKED after the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }
}

/// Primary result codes 5 (SQLITE_BUSY) and 6 (SQLITE_LOCKED).
///
/// sqlx reports the extended code, so the low byte is compared.
fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → busy / unique / foreign key / check / query
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                if is_busy_code(db_err.code().as_deref()) || msg.contains("database is locked") {
                    DbError::Busy(msg)
                } else if db_err.is_unique_violation() {
                    // "UNIQUE constraint failed: basket_lines.sale_id, basket_lines.product_id"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { message: msg }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { message: msg }
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Inventory Error
// =============================================================================

/// Error returned by every inventory operation.
///
/// Business outcomes (`Domain`) are final. Only lost optimistic races and
/// SQLite busy errors are retried.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl InventoryError {
    /// Outcome category for the request layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::Domain(err) => err.kind(),
            InventoryError::Storage(DbError::Busy(_)) => ErrorKind::ConcurrencyConflict,
            InventoryError::Storage(_) => ErrorKind::Infrastructure,
        }
    }

    /// Lost optimistic races and `Busy` are retried. Every mutation starts
    /// by taking the write lock, so `Busy` means another writer still held
    /// it after `busy_timeout`: contention, not a broken database.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InventoryError::Domain(CoreError::ConcurrencyConflict { .. })
                | InventoryError::Storage(DbError::Busy(_))
        )
    }

    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            InventoryError::Domain(err) => Some(err),
            InventoryError::Storage(_) => None,
        }
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::Storage(err.into())
    }
}

impl From<ValidationError> for InventoryError {
    fn from(err: ValidationError) -> Self {
        InventoryError::Domain(err.into())
    }
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

// =============================================================================
// Unit Tests
// =============================================================================
