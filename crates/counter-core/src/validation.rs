//! # Validation Module
//!
//! Input validation run before any cart mutation or database write.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Screen (out of scope)                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - cart quantities, prices, barcodes, names       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite - NOT NULL, CHECK (stock_current >= 0), UNIQUE,       │
//! │           FOREIGN KEY, category depth trigger                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_LINES, MAX_PRICE_CENTS, MAX_STOCK};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or category name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use counter_core::validation::validate_name;
///
/// assert!(validate_name("name", "Yerba 1kg").is_ok());
/// assert!(validate_name("name", "  ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Barcodes are matched by substring, so a blank or padded one would
/// match everything or nothing.
pub fn validate_barcode(barcode: Option<&str>) -> ValidationResult<()> {
    let Some(code) = barcode else {
        return Ok(());
    };

    if code.is_empty() || code.trim() != code {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must be non-empty without surrounding spaces".to_string(),
        });
    }

    if code.chars().count() > 64 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 64,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity. Must be positive; the upper bound is the
/// product's stock, checked by the cart and again at checkout.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Prices must be within `0..=MAX_PRICE_CENTS`. Zero is allowed (free items).
///
/// ```rust
/// use counter_core::validation::validate_price;
/// use counter_core::Money;
///
/// assert!(validate_price("price_sell", Money::from_cents(0)).is_ok());
/// assert!(validate_price("price_sell", Money::from_cents(-100)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&price.cents()) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock_current".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
