//! # Validation
//!
//! Input checks run before any stock is touched.
//!
//! ## Where Validation Happens
//! ```text
//! CreateBasketLine(sale, product, qty)
//!      │
//!      ├── validate_id(sale), validate_id(product)
//!      ├── validate_quantity(qty)        ← qty <= 0 → InvalidArgument
//!      │
//!      ▼
//! StockLedger.Reserve ...
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validators.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a requested quantity (add, reserve, release, restock).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
///
/// ## Example
/// ```rust
/// use market_core::validation::validate_quantity;
///
/// assert!(validate_quantity(4).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-2).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the target quantity of a basket line update.
///
/// Zero is allowed and means "remove the line".
pub fn validate_new_quantity(qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_LINE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in minor units. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an entity id (non-empty UUID).
///
/// ## Example
/// ```rust
/// use market_core::validation::validate_id;
///
/// assert!(validate_id("sale_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("sale_id", "").is_err());
/// assert!(validate_id("sale_id", "not-a-uuid").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-1).is_err());
        assert!(matches!(
            validate_quantity(MAX_LINE_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_new_quantity() {
        assert!(validate_new_quantity(0).is_ok());
        assert!(validate_new_quantity(7).is_ok());
        assert!(validate_new_quantity(-1).is_err());
        assert!(validate_new_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_id("id", "   ").is_err());
        assert!(validate_id("id", "123").is_err());
    }
}
