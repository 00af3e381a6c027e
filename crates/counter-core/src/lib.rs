//! # counter-core: Pure Business Logic for Counter POS
//!
//! Everything a terminal decides without touching storage: the cart, the
//! catalog filter, ticket formatting and inventory figures.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Counter POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Screens (out of this workspace)                │   │
//! │  │    Catalog grid ──► Cart panel ──► Checkout ──► Ticket preview  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ counter-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   cart    │  │  catalog  │  │  receipt  │  │ inventory │  │   │
//! │  │   │   Cart    │  │  Catalog  │  │  Ticket   │  │ Valuation │  │   │
//! │  │   │ CartLine  │  │ Category  │  │  render   │  │ low stock │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  counter-db (Database Layer)                    │   │
//! │  │        SQLite, repositories, checkout engine, sales history     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Row-shaped domain types (Product, Category, Sale, ...)
//! - [`money`] - Integer-cents money type
//! - [`cart`] - Cart manager with checkout token
//! - [`category`] - Validated two-level category hierarchy
//! - [`catalog`] - Product/category join view and search
//! - [`receipt`] - Ticket formatting
//! - [`inventory`] - Stock valuation
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use counter_core::cart::Cart;
//! use counter_core::{Money, Product};
//!
//! let bread = Product {
//!     id: "p1".to_string(),
//!     name: "Bread".to_string(),
//!     barcode: None,
//!     cost_price: Money::from_cents(300),
//!     price_sell: Money::from_cents(500),
//!     stock_current: 3,
//!     category_id: None,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add(&bread).unwrap();
//! cart.set_quantity("p1", 3).unwrap();
//! assert_eq!(cart.total().cents(), 1500);
//!
//! // A fourth unit would exceed the known stock.
//! assert!(cart.add(&bread).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod category;
pub mod error;
pub mod inventory;
pub mod money;
pub mod receipt;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CategoryError, CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Highest unit price or cost accepted for a product ($10,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Highest on-hand stock accepted for a product.
///
/// With [`MAX_PRICE_CENTS`] and [`MAX_CART_LINES`] this keeps a cart total
/// well inside `i64` cents.
pub const MAX_STOCK: i64 = 10_000_000;
