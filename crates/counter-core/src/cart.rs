//! # Cart Manager
//!
//! The mutable line-item collection of one terminal. Pure: no persistence.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Screen Action            Cart Method            Effect                │
//! │  ─────────────            ───────────            ──────                │
//! │  Tap product ───────────► add(product) ────────► qty + 1 / new line    │
//! │  Edit quantity ─────────► set_quantity(id, n) ─► qty = n (n ≥ 1)       │
//! │  Tap remove ────────────► remove(id) ──────────► line dropped          │
//! │  Tap clear ─────────────► clear() ─────────────► empty cart            │
//! │  Footer ────────────────► total() ─────────────► Σ qty × unit price    │
//! │                                                                         │
//! │  Every successful mutation rotates the checkout token.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout Token
//! The token identifies one revision of the cart's content. Checkout stores
//! it as the sale's idempotency key, so retrying checkout of an unchanged
//! cart can never produce a second sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_cart_size, validate_quantity};
use crate::MAX_CART_LINES;

/// A line in the cart.
///
/// Name, barcode and unit price are frozen when the product is first added,
/// so the cart shows consistent data even if the catalog changes meanwhile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub barcode: Option<String>,
    /// Unit price captured at add time.
    pub unit_price: Money,
    pub quantity: i64,
    /// Stock of the product in the snapshot the line was last added from.
    pub known_stock: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_product(product: &Product) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            barcode: product.barcode.clone(),
            unit_price: product.price_sell,
            quantity: 1,
            known_stock: product.stock_current,
            added_at: Utc::now(),
        }
    }

    /// Unit price × quantity.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// The cart of one terminal.
///
/// ## Invariants
/// - At most one line per product id
/// - 1 ≤ quantity ≤ known stock for every line
/// - A failed operation leaves lines and token untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    token: Uuid,
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            token: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of `product`.
    ///
    /// ## Behavior
    /// - Already in cart: quantity + 1, known stock refreshed from `product`
    /// - Not in cart: new line with quantity 1 at the product's current price
    ///
    /// ## Errors
    /// `StockExceeded` if the resulting quantity would exceed the product's
    /// stock. The cart is left unchanged on every error.
    pub fn add(&mut self, product: &Product) -> CoreResult<()> {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let requested = line.quantity + 1;
            if !product.can_sell(requested) {
                return Err(stock_exceeded(product, requested));
            }
            line.quantity = requested;
            line.known_stock = product.stock_current;
            self.touch();
            return Ok(());
        }

        if !product.can_sell(1) {
            return Err(stock_exceeded(product, 1));
        }
        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        })?;

        self.lines.push(CartLine::from_product(product));
        self.touch();
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Behavior
    /// - `quantity < 1`: rejected, the line is NOT removed
    /// - above the line's known stock: `StockExceeded`
    /// - product not in cart: `NotInCart`
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;

        if quantity > line.known_stock {
            return Err(CoreError::StockExceeded {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                available: line.known_stock,
                requested: quantity,
            });
        }

        if line.quantity != quantity {
            line.quantity = quantity;
            self.touch();
        }
        Ok(())
    }

    /// Removes a line. Returns `false` (no-op) if the product is not in the cart.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        let removed = self.lines.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Empties the cart and starts a new revision.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
        self.touch();
    }

    /// Σ(quantity × unit price).
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Number of distinct products.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Idempotency key for checking out the current revision.
    pub fn checkout_token(&self) -> Uuid {
        self.token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self) {
        self.token = Uuid::new_v4();
    }
}

fn stock_exceeded(product: &Product, requested: i64) -> CoreError {
    CoreError::StockExceeded {
        product_id: product.id.clone(),
        name: product.name.clone(),
        available: product.stock_current,
        requested,
    }
}

/// Cart totals summary for the screen layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            total: cart.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            barcode: None,
            cost_price: Money::from_cents(price_cents / 2),
            price_sell: Money::from_cents(price_cents),
            stock_current: stock,
            category_id: None,
        }
    }

    fn assert_invariants(cart: &Cart) {
        let expected: i64 = cart
            .lines()
            .iter()
            .map(|l| l.quantity * l.unit_price.cents())
            .sum();
        assert_eq!(cart.total().cents(), expected);

        let mut ids: Vec<&str> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), cart.line_count());

        for line in cart.lines() {
            assert!(line.quantity >= 1 && line.quantity <= line.known_stock);
        }
    }

    #[test]
    fn test_add_new_and_existing() {
        let mut cart = Cart::new();
        let yerba = product("1", 1000, 5);

        cart.add(&yerba).unwrap();
        cart.add(&yerba).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line("1").unwrap().quantity, 2);
        assert_eq!(cart.total().cents(), 2000);
        assert_invariants(&cart);
    }

    #[test]
    fn test_add_beyond_stock_fails_and_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let last_unit = product("1", 1000, 1);
        cart.add(&last_unit).unwrap();

        let before_lines = cart.lines().to_vec();
        let before_token = cart.checkout_token();

        let err = cart.add(&last_unit).unwrap_err();
        assert!(matches!(
            err,
            CoreError::StockExceeded { available: 1, requested: 2, .. }
        ));
        assert_eq!(cart.lines(), before_lines.as_slice());
        assert_eq!(cart.checkout_token(), before_token);
    }

    #[test]
    fn test_add_out_of_stock_product() {
        let mut cart = Cart::new();
        let err = cart.add(&product("1", 1000, 0)).unwrap_err();
        assert!(matches!(err, CoreError::StockExceeded { requested: 1, .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_price_captured_at_add_time() {
        let mut cart = Cart::new();
        let mut p = product("1", 1000, 5);
        cart.add(&p).unwrap();

        p.price_sell = Money::from_cents(1500);
        cart.add(&p).unwrap();

        assert_eq!(cart.line("1").unwrap().unit_price.cents(), 1000);
        assert_eq!(cart.total().cents(), 2000);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        cart.add(&product("1", 250, 10)).unwrap();

        cart.set_quantity("1", 4).unwrap();
        assert_eq!(cart.total().cents(), 1000);
        assert_invariants(&cart);
    }

    #[test]
    fn test_set_quantity_below_one_is_rejected_without_removing() {
        let mut cart = Cart::new();
        cart.add(&product("1", 250, 10)).unwrap();

        let err = cart.set_quantity("1", 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
        assert_eq!(cart.line("1").unwrap().quantity, 1);
    }

    #[test]
    fn test_set_quantity_above_known_stock() {
        let mut cart = Cart::new();
        cart.add(&product("1", 250, 3)).unwrap();

        assert!(matches!(
            cart.set_quantity("1", 4),
            Err(CoreError::StockExceeded { available: 3, requested: 4, .. })
        ));
        assert_eq!(cart.line("1").unwrap().quantity, 1);
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.set_quantity("nope", 2),
            Err(CoreError::NotInCart("nope".to_string()))
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(&product("1", 100, 5)).unwrap();
        cart.add(&product("2", 200, 5)).unwrap();

        assert!(cart.remove("1"));
        assert!(!cart.remove("1"));
        assert_eq!(cart.line_count(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_token_rotates_only_on_change() {
        let mut cart = Cart::new();
        let t0 = cart.checkout_token();

        cart.add(&product("1", 100, 5)).unwrap();
        let t1 = cart.checkout_token();
        assert_ne!(t0, t1);

        cart.set_quantity("1", 1).unwrap();
        assert_eq!(cart.checkout_token(), t1);

        assert!(!cart.remove("absent"));
        assert_eq!(cart.checkout_token(), t1);

        cart.set_quantity("1", 2).unwrap();
        assert_ne!(cart.checkout_token(), t1);
    }

    #[test]
    fn test_mixed_operation_sequence_keeps_invariants() {
        let mut cart = Cart::new();
        let products: Vec<Product> = (0..4)
            .map(|i| product(&i.to_string(), 100 * (i + 1), i + 2))
            .collect();

        for step in 0..40i64 {
            let p = &products[(step % 4) as usize];
            match step % 5 {
                0 | 1 => {
                    let _ = cart.add(p);
                }
                2 => {
                    let _ = cart.set_quantity(&p.id, step % 7 - 1);
                }
                3 => {
                    cart.remove(&p.id);
                }
                _ => {
                    let _ = cart.add(p);
                    let _ = cart.add(p);
                }
            }
            assert_invariants(&cart);
        }
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            cart.add(&product(&format!("p{}", i), 100, 1)).unwrap();
        }
        assert_eq!(
            cart.add(&product("extra", 100, 1)),
            Err(CoreError::CartTooLarge { max: MAX_CART_LINES })
        );
    }

    #[test]
    fn test_bulk_quantity_is_bounded_by_stock_only() {
        let screws = product("screw", 5, 5000);
        let mut cart = Cart::new();
        for _ in 0..1200 {
            cart.add(&screws).unwrap();
        }
        assert_eq!(cart.line("screw").unwrap().quantity, 1200);

        cart.set_quantity("screw", 5000).unwrap();
        assert_eq!(cart.total().cents(), 25_000);
        assert!(matches!(
            cart.set_quantity("screw", 5001),
            Err(CoreError::StockExceeded { available: 5000, .. })
        ));
        assert_invariants(&cart);
    }

    #[test]
    fn test_absurd_price_does_not_overflow_total() {
        let mut cart = Cart::new();
        cart.add(&product("gold", i64::MAX / 2, 10)).unwrap();
        cart.set_quantity("gold", 10).unwrap();
        assert_eq!(cart.total().cents(), i64::MAX);
    }

    #[test]
    fn test_totals_summary() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 5)).unwrap();
        cart.add(&product("1", 1000, 5)).unwrap();
        cart.add(&product("2", 500, 5)).unwrap();

        let totals = CartTotals::from(&cart);
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.total.cents(), 2500);
    }
}
