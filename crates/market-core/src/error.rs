//! # Error Types
//!
//! Domain error taxonomy for the inventory core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  market-core errors (this file)                                        │
//! │  ├── CoreError        - Business outcomes (typed, never retried)       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  market-db errors (separate crate)                                     │
//! │  ├── DbError          - Storage faults                                 │
//! │  └── InventoryError   - CoreError | DbError                            │
//! │                                                                         │
//! │  Request layer sees: ErrorKind + message                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Outcome Mapping
//! | CoreError            | ErrorKind           |
//! |----------------------|---------------------|
//! | NotFound             | NOT_FOUND           |
//! | Validation           | INVALID_ARGUMENT    |
//! | InsufficientStock    | INSUFFICIENT_STOCK  |
//! | InvalidSaleStatus    | INVALID_STATE       |
//! | ConcurrencyConflict  | CONCURRENCY_CONFLICT|

use serde::Serialize;
use thiserror::Error;

use crate::types::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every rejected mutation surfaces one of these variants. None of them is
/// a silent no-op.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced product, branch, sale, basket line or stock record
    /// does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Reservation would drive stock negative.
    ///
    /// ## User Workflow
    /// ```text
    /// StockRecord(P, B) quantity = 3
    ///      │
    ///      ▼
    /// CreateBasketLine(S, P, 5)
    ///      │
    ///      ▼
    /// InsufficientStock { product: P, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Ledger and basket untouched
    /// ```
    #[error(
        "Insufficient stock for product {product_id} at branch {branch_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        branch_id: String,
        available: i64,
        requested: i64,
    },

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing the basket of a completed or cancelled sale
    /// - Finalizing or cancelling a sale twice
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: SaleStatus,
    },

    /// Optimistic write lost its race more times than the retry budget allows.
    #[error("Concurrency conflict in {operation} for {id} after {attempts} attempts")]
    ConcurrencyConflict {
        operation: String,
        id: String,
        attempts: u32,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the request-facing outcome category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidSaleStatus { .. } => ErrorKind::InvalidState,
            CoreError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            CoreError::Validation(_) => ErrorKind::InvalidArgument,
        }
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Outcome categories exposed to the request layer.
///
/// ## Usage in the request layer
/// ```text
/// NOT_FOUND            → 404
/// INVALID_ARGUMENT     → 400
/// INSUFFICIENT_STOCK   → 409
/// INVALID_STATE        → 409
/// CONCURRENCY_CONFLICT → 503 (client may retry)
/// INFRASTRUCTURE       → 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InsufficientStock,
    InvalidState,
    ConcurrencyConflict,
    /// Storage-layer fault (connectivity, unexpected constraint failure).
    Infrastructure,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any stock is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            branch_id: "b-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1 at branch b-1: available 3, requested 5"
        );

        let err = CoreError::InvalidSaleStatus {
            sale_id: "s-1".to_string(),
            current_status: SaleStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Sale s-1 is completed, cannot perform operation"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CoreError::not_found("Sale", "x").kind(),
            ErrorKind::NotFound
        );
        let validation: CoreError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert_eq!(validation.kind(), ErrorKind::InvalidArgument);
        assert!(matches!(validation, CoreError::Validation(_)));
    }

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
        let json = serde_json::to_string(&ErrorKind::InvalidState).unwrap();
        assert_eq!(json, "\"INVALID_STATE\"");
    }
}
