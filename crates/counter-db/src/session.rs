//! # Terminal Session
//!
//! One per physical terminal. Owns that terminal's cart and checkout engine;
//! shares only the database handle with other sessions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   TerminalSession "till-1"        TerminalSession "till-2"              │
//! │   ┌──────────────────────┐        ┌──────────────────────┐              │
//! │   │ Cart                 │        │ Cart                 │              │
//! │   │ CheckoutEngine       │        │ CheckoutEngine       │              │
//! │   └──────────┬───────────┘        └──────────┬───────────┘              │
//! │              └───────────► Database ◄────────┘                          │
//! │                        (shared pool, shared stock)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart is cleared only after checkout returns a committed sale. A
//! failed or cancelled checkout (future dropped) leaves it as it was, with
//! the same checkout token, so a retry cannot double-sell.

use tracing::info;

use counter_core::cart::{Cart, CartTotals};
use counter_core::catalog::{Catalog, CatalogQuery};
use counter_core::receipt::{format_ticket, Ticket, TicketKind, TicketSource};
use counter_core::{CoreResult, Product, StoreIdentity};

use crate::checkout::{CheckoutEngine, CheckoutReceipt, PricePolicy};
use crate::config::AppConfig;
use crate::error::{CheckoutResult, DbResult};
use crate::pool::Database;

pub struct TerminalSession {
    db: Database,
    cart: Cart,
    engine: CheckoutEngine,
}

impl TerminalSession {
    pub fn new(db: Database, terminal_id: impl Into<String>, policy: PricePolicy) -> Self {
        let engine = db.checkout(terminal_id, policy);
        TerminalSession {
            db,
            cart: Cart::new(),
            engine,
        }
    }

    /// Session configured from the `[terminal]` and `[checkout]` sections.
    pub fn from_config(db: Database, config: &AppConfig) -> Self {
        Self::new(db, config.terminal.id.clone(), config.checkout.price_policy)
    }

    pub fn terminal_id(&self) -> &str {
        self.engine.terminal_id()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(&self.cart)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Loads a fresh sellable catalog snapshot.
    pub async fn catalog(&self) -> DbResult<Catalog> {
        self.db.load_catalog().await
    }

    /// Loads the catalog and filters it. Convenience for one-off searches;
    /// screens that filter repeatedly should keep the [`Catalog`].
    pub async fn search(&self, query: &CatalogQuery) -> DbResult<Vec<Product>> {
        let catalog = self.catalog().await?;
        let hits = catalog.search(query);
        Ok(hits.into_iter().map(|entry| entry.product.clone()).collect())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub fn add(&mut self, product: &Product) -> CoreResult<()> {
        self.cart.add(product)
    }

    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        self.cart.set_quantity(product_id, quantity)
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        self.cart.remove(product_id)
    }

    pub fn clear(&mut self) {
        self.cart.clear()
    }

    /// Ticket preview of the current cart, with a `DRAFT` reference.
    pub fn preview(&self, store: &StoreIdentity) -> Ticket {
        format_ticket(
            store,
            &TicketSource::from(&self.cart),
            chrono::Utc::now(),
            TicketKind::Original,
        )
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Checks out the cart and clears it once the sale is committed.
    pub async fn checkout(&mut self) -> CheckoutResult<Option<CheckoutReceipt>> {
        let result = self.engine.checkout(&self.cart).await?;

        if let Some(receipt) = &result {
            info!(
                terminal_id = %self.terminal_id(),
                sale_id = %receipt.sale_id(),
                "Cart cleared after sale"
            );
            self.cart.clear();
        }

        Ok(result)
    }
}
