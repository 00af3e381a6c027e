//! # Domain Types
//!
//! Row-shaped domain types shared by the pure core and the database layer.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Category     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name, barcode  │   │  name           │   │  created_at     │       │
//! │  │  price_sell     │   │  parent_id      │   │  total          │       │
//! │  │  stock_current  │   └─────────────────┘   └────────┬────────┘       │
//! │  │  category_id    │                                  │ 1..n           │
//! │  └─────────────────┘                         ┌────────▼────────┐       │
//! │                                              │    SaleItem     │       │
//! │  ┌─────────────────┐                         │  product_id     │       │
//! │  │  StoreIdentity  │ ──► ticket header       │  quantity       │       │
//! │  └─────────────────┘                         │  price (frozen) │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier and on the ticket.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, ...). Searchable.
    pub barcode: Option<String>,

    /// Purchase cost, used for inventory valuation.
    pub cost_price: Money,

    /// Selling price.
    pub price_sell: Money,

    /// On-hand stock, never negative.
    pub stock_current: i64,

    /// Category (root or child), if any.
    pub category_id: Option<String>,
}

impl Product {
    /// Checks if `quantity` units are covered by the stock known in this snapshot.
    ///
    /// Only an optimistic check; the authoritative one is the conditional
    /// decrement at checkout time.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock_current
    }
}

// =============================================================================
// Category
// =============================================================================

/// A flat category row as stored. See [`crate::category`] for the
/// validated two-level hierarchy built from these rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

impl Category {
    /// Convenience constructor for a root category.
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        Category {
            id: id.into(),
            name: name.into(),
            parent_id: None,
        }
    }

    /// Convenience constructor for a child category.
    pub fn child(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Category {
            id: id.into(),
            name: name.into(),
            parent_id: Some(parent_id.into()),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Σ(quantity × price) of its items, computed at commit time.
    pub total: Money,

    /// Terminal that rang up the sale.
    pub terminal_id: String,

    /// Checkout token of the cart revision that produced this sale.
    pub idempotency_key: String,
}

impl Sale {
    /// Short reference printed on tickets (first 8 characters of the id).
    pub fn short_ref(&self) -> String {
        self.id.chars().take(8).collect()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a committed sale.
///
/// `price` is the unit price at the time of sale, frozen independently of
/// later catalog price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// Index of the line in the cart it came from.
    pub position: i64,
    pub product_id: String,
    pub quantity: i64,
    pub price: Money,
}

impl SaleItem {
    /// Line subtotal (price × quantity).
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale Record (history view)
// =============================================================================

/// A sale item joined with its product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    /// Product name, or a placeholder when the product no longer exists.
    pub name: String,
    pub quantity: i64,
    pub price: Money,
}

impl SaleLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

/// A sale with its lines in original cart order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

impl SaleRecord {
    /// Number of lines (distinct products).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

// =============================================================================
// Store Identity
// =============================================================================

/// Store identity printed in the ticket header (`store_settings` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoreIdentity {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub logo_url: Option<String>,
}

impl Default for StoreIdentity {
    /// Used until the store has been configured.
    fn default() -> Self {
        StoreIdentity {
            id: 1,
            name: "My Store".to_string(),
            address: String::new(),
            phone: String::new(),
            logo_url: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_ref_takes_eight_chars() {
        let sale = Sale {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            created_at: Utc::now(),
            total: Money::zero(),
            terminal_id: "pos-01".to_string(),
            idempotency_key: "k".to_string(),
        };
        assert_eq!(sale.short_ref(), "550e8400");
    }

    #[test]
    fn test_sale_item_subtotal() {
        let item = SaleItem {
            id: "i".to_string(),
            sale_id: "s".to_string(),
            position: 0,
            product_id: "p".to_string(),
            quantity: 3,
            price: Money::from_cents(250),
        };
        assert_eq!(item.subtotal().cents(), 750);
    }

    #[test]
    fn test_can_sell_uses_known_stock() {
        let product = Product {
            id: "p".to_string(),
            name: "Yerba 1kg".to_string(),
            barcode: None,
            cost_price: Money::from_cents(300),
            price_sell: Money::from_cents(500),
            stock_current: 2,
            category_id: None,
        };
        assert!(product.can_sell(2));
        assert!(!product.can_sell(3));
    }
}
