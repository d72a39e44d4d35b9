//! # Basket Rules
//!
//! Pure side of the basket aggregator: line pricing, merging a repeated
//! add into the existing line, and the stock delta an update implies.
//!
//! ## Merge, Never Duplicate
//! ```text
//! Sale S                         Sale S
//! ┌─────────────────────┐        ┌─────────────────────┐
//! │ P  qty 2  price 2u  │  + 3P  │ P  qty 5  price 5u  │
//! └─────────────────────┘  ───►  └─────────────────────┘
//!
//! One line per (sale, product). The storage layer backs this with a
//! unique index; these functions compute the merged row.
//! ```

use chrono::Utc;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::BasketLine;
use crate::MAX_LINE_QUANTITY;

/// Computes `quantity × unit_price`, rejecting overflow.
pub fn line_price(unit_price: Money, quantity: i64) -> CoreResult<Money> {
    unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| price_overflow().into())
}

fn price_overflow() -> ValidationError {
    ValidationError::OutOfRange {
        field: "price".to_string(),
        min: 0,
        max: i64::MAX,
    }
}

impl BasketLine {
    /// Builds the first line for a product in a sale.
    pub fn new(
        sale_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> CoreResult<Self> {
        let price = line_price(unit_price, quantity)?;
        let now = Utc::now();

        Ok(BasketLine {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: sale_id.into(),
            product_id: product_id.into(),
            quantity,
            price_cents: price.cents(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Folds a repeated add of `quantity` units into this line.
    ///
    /// Each add is priced at the unit price current at the time of the add,
    /// so earlier units keep the price they were added at.
    ///
    /// ## Example
    /// ```rust
    /// use market_core::{BasketLine, Money};
    ///
    /// let unit = Money::from_cents(150);
    /// let line = BasketLine::new("sale", "product", 2, unit).unwrap();
    /// let merged = line.merged_with(3, unit).unwrap();
    ///
    /// assert_eq!(merged.id, line.id);
    /// assert_eq!(merged.quantity, 5);
    /// assert_eq!(merged.price_cents, 750);
    /// assert_eq!(merged.version, line.version + 1);
    /// ```
    ///
    /// ## Errors
    /// `Validation` when the merged quantity would exceed
    /// [`MAX_LINE_QUANTITY`](crate::MAX_LINE_QUANTITY).
    pub fn merged_with(&self, quantity: i64, unit_price: Money) -> CoreResult<Self> {
        let quantity = self
            .quantity
            .checked_add(quantity)
            .filter(|merged| *merged <= MAX_LINE_QUANTITY)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            })?;
        let added = line_price(unit_price, quantity - self.quantity)?;
        let price = self.price().checked_add(added).ok_or_else(price_overflow)?;

        Ok(BasketLine {
            quantity,
            price_cents: price.cents(),
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Sets the line to `new_quantity` units, all at the current unit price.
    pub fn repriced(&self, new_quantity: i64, unit_price: Money) -> CoreResult<Self> {
        let price = line_price(unit_price, new_quantity)?;

        Ok(BasketLine {
            quantity: new_quantity,
            price_cents: price.cents(),
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Ledger call implied by changing a line from one quantity to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// Line grew; reserve the difference before applying.
    Reserve(i64),
    /// Line shrank; release the difference.
    Release(i64),
    Unchanged,
}

impl StockAdjustment {
    /// ## Example
    /// ```rust
    /// use market_core::basket::StockAdjustment;
    ///
    /// assert_eq!(StockAdjustment::between(4, 7), StockAdjustment::Reserve(3));
    /// assert_eq!(StockAdjustment::between(7, 0), StockAdjustment::Release(7));
    /// assert_eq!(StockAdjustment::between(2, 2), StockAdjustment::Unchanged);
    /// ```
    pub fn between(old_quantity: i64, new_quantity: i64) -> Self {
        let delta = new_quantity - old_quantity;
        match delta {
            d if d > 0 => StockAdjustment::Reserve(d),
            d if d < 0 => StockAdjustment::Release(-d),
            _ => StockAdjustment::Unchanged,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_new_line() {
        let line = BasketLine::new("s", "p", 4, Money::from_cents(250)).unwrap();
        assert_eq!(line.quantity, 4);
        assert_eq!(line.price_cents, 1000);
        assert_eq!(line.version, 1);
        assert!(uuid::Uuid::parse_str(&line.id).is_ok());
    }

    #[test]
    fn test_merge_two_then_three() {
        let unit = Money::from_cents(199);
        let line = BasketLine::new("s", "p", 2, unit).unwrap();
        let merged = line.merged_with(3, unit).unwrap();

        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.price(), unit.multiply_quantity(5));
        assert_eq!(merged.sale_id, "s");
        assert_eq!(merged.created_at, line.created_at);
    }

    #[test]
    fn test_merge_keeps_earlier_unit_price() {
        let line = BasketLine::new("s", "p", 2, Money::from_cents(100)).unwrap();
        let merged = line.merged_with(1, Money::from_cents(120)).unwrap();
        assert_eq!(merged.price_cents, 320);
    }

    #[test]
    fn test_merge_respects_line_cap() {
        let unit = Money::from_cents(10);
        let line = BasketLine::new("s", "p", MAX_LINE_QUANTITY - 1, unit).unwrap();
        assert_eq!(line.merged_with(1, unit).unwrap().quantity, MAX_LINE_QUANTITY);

        let err = line.merged_with(2, unit).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { max: MAX_LINE_QUANTITY, .. })
        ));
    }

    #[test]
    fn test_repriced() {
        let line = BasketLine::new("s", "p", 2, Money::from_cents(100)).unwrap();
        let updated = line.repriced(6, Money::from_cents(120)).unwrap();
        assert_eq!(updated.quantity, 6);
        assert_eq!(updated.price_cents, 720);
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn test_price_overflow_rejected() {
        let err = line_price(Money::from_cents(i64::MAX), 2).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let line = BasketLine::new("s", "p", 1, Money::from_cents(i64::MAX)).unwrap();
        assert!(line.merged_with(1, Money::from_cents(1)).is_err());
    }

    #[test]
    fn test_stock_adjustment() {
        assert_eq!(StockAdjustment::between(0, 5), StockAdjustment::Reserve(5));
        assert_eq!(StockAdjustment::between(5, 1), StockAdjustment::Release(4));
        assert_eq!(StockAdjustment::between(3, 3), StockAdjustment::Unchanged);
    }
}
