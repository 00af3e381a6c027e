//! # Error Types
//!
//! Domain-specific error types for counter-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  counter-core errors (this file)                                       │
//! │  ├── CoreError        - Cart / business rule violations                │
//! │  ├── CategoryError    - Malformed category hierarchy                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  counter-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - Checkout transaction failures                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Adding to the cart would exceed the stock known for the product.
    ///
    /// ## User Workflow
    /// ```text
    /// Tap "Yerba 1kg" (stock snapshot: 2, already 2 in cart)
    ///      │
    ///      ▼
    /// StockExceeded { available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Cart unchanged, screen shows "No more stock available"
    /// ```
    ///
    /// This check runs against a possibly stale snapshot. The checkout
    /// engine re-checks against live stock.
    #[error("Not enough stock for {name}: available {available}, requested {requested}")]
    StockExceeded {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(String),

    /// Cart has reached the maximum number of lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The category rows do not form a valid two-level hierarchy.
    #[error("Invalid category hierarchy: {0}")]
    Category(#[from] CategoryError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Category Error
// =============================================================================

/// Reasons a set of category rows is rejected by
/// [`CategoryTree::build`](crate::category::CategoryTree::build).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// The parent is itself a child. Only two levels are allowed.
    #[error("category {id} cannot be nested under {parent_id}, which is already a subcategory")]
    Grandchild { id: String, parent_id: String },

    /// The parent id does not refer to a known category.
    #[error("category {id} refers to unknown parent {parent_id}")]
    UnknownParent { id: String, parent_id: String },

    /// A category lists itself as its parent.
    #[error("category {0} cannot be its own parent")]
    SelfParent(String),

    /// Two rows share an id.
    #[error("duplicate category id {0}")]
    Duplicate(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

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
        let err = CoreError::StockExceeded {
            product_id: "p1".to_string(),
            name: "Yerba 1kg".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Yerba 1kg: available 2, requested 3"
        );
    }

    #[test]
    fn test_category_error_converts_to_core_error() {
        let err: CoreError = CategoryError::SelfParent("c1".to_string()).into();
        assert!(matches!(err, CoreError::Category(_)));
        assert_eq!(
            err.to_string(),
            "Invalid category hierarchy: category c1 cannot be its own parent"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
