//! # Sale Lifecycle
//!
//! The finite state machine deciding which operations are legal on a sale.
//!
//! ## State Diagram
//! ```text
//!                    EditBasket
//!                   ┌─────────┐
//!                   │         │
//!                   ▼         │
//!            ┌──────────────────┐
//!  create ──►│    in_process    │
//!            └────────┬─────────┘
//!                     │
//!          Finalize   │   Cancel
//!        ┌────────────┴────────────┐
//!        ▼                         ▼
//! ┌──────────────┐         ┌──────────────┐
//! │  completed   │         │  cancelled   │
//! │  (terminal)  │         │  (terminal)  │
//! └──────────────┘         └──────────────┘
//! ```
//!
//! Nothing leaves a terminal state. Refunds and returns are not modelled.

use crate::error::{CoreError, CoreResult};
use crate::types::SaleStatus;

/// An operation requested against a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleAction {
    /// Add, update or delete a basket line.
    EditBasket,
    /// Lock the basket and commit the total price.
    Finalize,
    /// Abandon the sale and return reserved stock.
    Cancel,
}

impl SaleStatus {
    /// Basket lines may only change while the sale is in process.
    #[inline]
    pub const fn is_editable(&self) -> bool {
        matches!(self, SaleStatus::InProcess)
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::Cancelled)
    }
}

/// Computes the status a sale moves to when `action` is applied.
///
/// ## Errors
/// `CoreError::InvalidSaleStatus` for any action on a terminal sale.
///
/// ## Example
/// ```rust
/// use market_core::lifecycle::{transition, SaleAction};
/// use market_core::{CoreError, SaleStatus};
///
/// assert_eq!(
///     transition("s", SaleStatus::InProcess, SaleAction::Cancel).unwrap(),
///     SaleStatus::Cancelled
/// );
/// assert!(matches!(
///     transition("s", SaleStatus::Cancelled, SaleAction::Finalize),
///     Err(CoreError::InvalidSaleStatus { .. })
/// ));
/// ```
pub fn transition(sale_id: &str, current: SaleStatus, action: SaleAction) -> CoreResult<SaleStatus> {
    match (current, action) {
        (SaleStatus::InProcess, SaleAction::EditBasket) => Ok(SaleStatus::InProcess),
        (SaleStatus::InProcess, SaleAction::Finalize) => Ok(SaleStatus::Completed),
        (SaleStatus::InProcess, SaleAction::Cancel) => Ok(SaleStatus::Cancelled),
        (status, _) => Err(CoreError::InvalidSaleStatus {
            sale_id: sale_id.to_string(),
            current_status: status,
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: [SaleAction; 3] = [
        SaleAction::EditBasket,
        SaleAction::Finalize,
        SaleAction::Cancel,
    ];

    #[test]
    fn test_in_process_transitions() {
        assert_eq!(
            transition("s", SaleStatus::InProcess, SaleAction::EditBasket).unwrap(),
            SaleStatus::InProcess
        );
        assert_eq!(
            transition("s", SaleStatus::InProcess, SaleAction::Finalize).unwrap(),
            SaleStatus::Completed
        );
        assert_eq!(
            transition("s", SaleStatus::InProcess, SaleAction::Cancel).unwrap(),
            SaleStatus::Cancelled
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [SaleStatus::Completed, SaleStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(!status.is_editable());
            for action in ACTIONS {
                match transition("s-9", status, action) {
                    Err(CoreError::InvalidSaleStatus {
                        sale_id,
                        current_status,
                    }) => {
                        assert_eq!(sale_id, "s-9");
                        assert_eq!(current_status, status);
                    }
                    other => panic!("expected InvalidSaleStatus, got {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_in_process_is_editable() {
        assert!(SaleStatus::InProcess.is_editable());
        assert!(!SaleStatus::InProcess.is_terminal());
    }
}
