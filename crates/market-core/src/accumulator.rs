//! # Sale Accumulator
//!
//! Sale totals and the stock re-validation that gates Finalize.
//!
//! ## Finalize Check
//! ```text
//! for each basket line of the sale:
//!
//!     implied = stock.reserved - line.quantity
//!
//!     implied >= 0  → reservation still backed by stock
//!     implied <  0  → a stock correction ate into this sale's units
//!                     → InsufficientStock, sale stays in_process
//! ```
//!
//! Reservations already happened when lines were added, so this only
//! catches external corrections (write-offs, manual counts) made since.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::BasketLine;

/// Sum of every line price.
///
/// ## Example
/// ```rust
/// use market_core::accumulator::sale_total;
/// use market_core::{BasketLine, Money};
///
/// let lines = vec![
///     BasketLine::new("s", "p1", 2, Money::from_cents(100)).unwrap(),
///     BasketLine::new("s", "p2", 1, Money::from_cents(450)).unwrap(),
/// ];
/// assert_eq!(sale_total(&lines), Money::from_cents(650));
/// assert_eq!(sale_total(&[]), Money::zero());
/// ```
pub fn sale_total(lines: &[BasketLine]) -> Money {
    lines.iter().map(BasketLine::price).sum()
}

/// Live stock figures for one basket line at finalize time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationCheck {
    pub product_id: String,
    /// Units the line claims.
    pub line_quantity: i64,
    /// Units currently held in reservation for the product at the branch.
    pub reserved: i64,
    /// Free units currently on the shelf (informational).
    pub available: i64,
}

impl ReservationCheck {
    /// Reserved units left over once this line takes its share.
    #[inline]
    pub fn implied_availability(&self) -> i64 {
        self.reserved - self.line_quantity
    }
}

/// Fails on the first line whose reservation is no longer backed by stock.
///
/// The reported `available` is what the line could still claim, i.e. the
/// reserved count.
pub fn validate_for_finalize(branch_id: &str, checks: &[ReservationCheck]) -> CoreResult<()> {
    match checks.iter().find(|c| c.implied_availability() < 0) {
        Some(check) => Err(CoreError::InsufficientStock {
            product_id: check.product_id.clone(),
            branch_id: branch_id.to_string(),
            available: check.reserved,
            requested: check.line_quantity,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
