//! # Checkout Engine
//!
//! Converts a cart into a committed sale: one `sales` row, one `sale_items`
//! row per line and one conditional stock decrement per line, all in a
//! single SQLite transaction.
//!
//! ## Checkout Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout(cart)                                                         │
//! │       │                                                                 │
//! │       ├── cart empty? ─────────────────────────────► Ok(None), no I/O   │
//! │       │                                                                 │
//! │       ├── sale with idempotency_key = token? ──────► replayed receipt   │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── INSERT sales (first statement: takes the write lock)          │
//! │       │                                                                 │
//! │       ├── for each line, in cart order:                                 │
//! │       │     ├── SELECT live price ── PricePolicy ──► PriceChanged       │
//! │       │     ├── INSERT sale_items                                       │
//! │       │     └── UPDATE products                                         │
//! │       │           SET stock_current = stock_current - qty               │
//! │       │           WHERE id = ? AND stock_current >= qty                 │
//! │       │           0 rows ──────────────────────────► StockInsufficient  │
//! │       │                                                                 │
//! │  COMMIT ───────────────────────────────────────────► receipt            │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: ROLLBACK, nothing kept. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotency
//! The cart's checkout token is stored as `sales.idempotency_key` (UNIQUE).
//! Retrying an unchanged cart either finds the committed sale up front, or
//! loses the race on the UNIQUE index and then finds it. Either way the
//! caller gets the original sale back with `replayed = true`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use counter_core::cart::{Cart, CartLine};
use counter_core::receipt::{format_ticket, Ticket, TicketKind, TicketSource};
use counter_core::validation::{validate_price, validate_quantity};
use counter_core::{Money, Sale, SaleItem, SaleLine, SaleRecord, StoreIdentity, ValidationError};

use crate::error::{CheckoutError, CheckoutResult, CheckoutStep};
use crate::history::SalesHistory;
use crate::repository::sale::{
    self, generate_sale_id, generate_sale_item_id, now_timestamp, SaleRepository,
};

const IDEMPOTENCY_KEY_FIELD: &str = "sales.idempotency_key";

// =============================================================================
// Price Policy
// =============================================================================

/// What to do when a product's live price differs from the price captured
/// in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePolicy {
    /// Fail with `PriceChanged`; the cashier re-adds the product.
    #[default]
    RejectStale,
    /// Sell at the captured price.
    Captured,
}

impl FromStr for PricePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject_stale" => Ok(PricePolicy::RejectStale),
            "captured" => Ok(PricePolicy::Captured),
            other => Err(ValidationError::InvalidFormat {
                field: "price_policy".to_string(),
                reason: format!("unknown policy '{}', expected reject_stale or captured", other),
            }),
        }
    }
}

impl fmt::Display for PricePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePolicy::RejectStale => f.write_str("reject_stale"),
            PricePolicy::Captured => f.write_str("captured"),
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    /// The committed sale with its lines.
    pub record: SaleRecord,
    /// True when the sale had already been committed by an earlier attempt
    /// with the same cart token.
    pub replayed: bool,
}

impl CheckoutReceipt {
    pub fn sale_id(&self) -> &str {
        &self.record.sale.id
    }

    pub fn total(&self) -> Money {
        self.record.sale.total
    }

    /// The customer ticket for this sale.
    pub fn ticket(&self, store: &StoreIdentity) -> Ticket {
        format_ticket(
            store,
            &TicketSource::from(&self.record),
            self.record.sale.created_at,
            TicketKind::Original,
        )
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Runs checkouts for one terminal.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
    terminal_id: String,
    policy: PricePolicy,
}

impl CheckoutEngine {
    pub fn new(pool: SqlitePool, terminal_id: impl Into<String>, policy: PricePolicy) -> Self {
        CheckoutEngine {
            pool,
            terminal_id: terminal_id.into(),
            policy,
        }
    }

    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    pub fn policy(&self) -> PricePolicy {
        self.policy
    }

    /// Commits the cart as a sale.
    ///
    /// ## Returns
    /// * `Ok(None)` - Cart is empty, nothing was done
    /// * `Ok(Some(receipt))` - Sale committed (or replayed)
    /// * `Err(CheckoutError)` - Nothing persisted, cart should be kept
    ///
    /// The cart itself is never modified here.
    pub async fn checkout(&self, cart: &Cart) -> CheckoutResult<Option<CheckoutReceipt>> {
        if cart.is_empty() {
            debug!(terminal_id = %self.terminal_id, "Checkout of empty cart ignored");
            return Ok(None);
        }

        for line in cart.lines() {
            validate_line(line)?;
        }

        let key = cart.checkout_token().to_string();

        if let Some(record) = self.find_committed(&key, CheckoutStep::LookupExisting).await? {
            warn!(sale_id = %record.sale.id, key = %key, "Checkout replayed from earlier attempt");
            return Ok(Some(CheckoutReceipt {
                record,
                replayed: true,
            }));
        }

        match self.commit_sale(cart, &key).await {
            Ok(record) => {
                info!(
                    sale_id = %record.sale.id,
                    terminal_id = %self.terminal_id,
                    total = %record.sale.total,
                    lines = record.lines.len(),
                    "Sale committed"
                );
                Ok(Some(CheckoutReceipt {
                    record,
                    replayed: false,
                }))
            }

            // A concurrent attempt with the same token committed first.
            Err(CheckoutError::Persistence {
                step: CheckoutStep::InsertSale,
                source,
                ..
            }) if source.is_unique_violation_on(IDEMPOTENCY_KEY_FIELD) => {
                match self.find_committed(&key, CheckoutStep::LoadReceipt).await? {
                    Some(record) => {
                        warn!(sale_id = %record.sale.id, key = %key, "Checkout raced a retry, replaying");
                        Ok(Some(CheckoutReceipt {
                            record,
                            replayed: true,
                        }))
                    }
                    None => Err(CheckoutError::persistence(CheckoutStep::InsertSale, None, source)),
                }
            }

            Err(err) => {
                warn!(terminal_id = %self.terminal_id, error = %err, "Checkout rejected");
                Err(err)
            }
        }
    }

    async fn find_committed(&self, key: &str, step: CheckoutStep) -> CheckoutResult<Option<SaleRecord>> {
        let sale = SaleRepository::new(self.pool.clone())
            .find_by_idempotency_key(key)
            .await
            .map_err(|e| CheckoutError::persistence(step, None, e))?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        SalesHistory::new(self.pool.clone())
            .get(&sale.id)
            .await
            .map_err(|e| CheckoutError::persistence(CheckoutStep::LoadReceipt, None, e))
    }

    /// The transactional part. Returning early drops `tx`, which rolls back.
    async fn commit_sale(&self, cart: &Cart, key: &str) -> CheckoutResult<SaleRecord> {
        let sale = Sale {
            id: generate_sale_id(),
            created_at: now_timestamp(),
            total: cart.total(),
            terminal_id: self.terminal_id.clone(),
            idempotency_key: key.to_string(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CheckoutError::persistence(CheckoutStep::BeginTransaction, None, e))?;

        sale::insert_sale(&mut tx, &sale)
            .await
            .map_err(|e| CheckoutError::persistence(CheckoutStep::InsertSale, None, e))?;

        let mut lines = Vec::with_capacity(cart.line_count());

        for (index, line) in cart.lines().iter().enumerate() {
            let live: Option<(String, Money)> =
                sqlx::query_as("SELECT name, price_sell FROM products WHERE id = ?1")
                    .bind(&line.product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| CheckoutError::persistence(CheckoutStep::CheckPrice, Some(index), e))?;

            let Some((name, current_price)) = live else {
                return Err(CheckoutError::ProductUnavailable(line.product_id.clone()));
            };

            if self.policy == PricePolicy::RejectStale && current_price != line.unit_price {
                return Err(CheckoutError::PriceChanged {
                    product_id: line.product_id.clone(),
                    captured: line.unit_price,
                    current: current_price,
                });
            }

            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale.id.clone(),
                position: index as i64,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.unit_price,
            };
            sale::insert_item(&mut tx, &item)
                .await
                .map_err(|e| CheckoutError::persistence(CheckoutStep::InsertSaleItem, Some(index), e))?;

            let decremented = sqlx::query(
                r#"
                UPDATE products
                SET stock_current = stock_current - ?2
                WHERE id = ?1 AND stock_current >= ?2
                "#,
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| CheckoutError::persistence(CheckoutStep::DecrementStock, Some(index), e))?;

            if decremented.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock_current FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| {
                            CheckoutError::persistence(CheckoutStep::DecrementStock, Some(index), e)
                        })?;

                return Err(match available {
                    None => CheckoutError::ProductUnavailable(line.product_id.clone()),
                    Some(available) => CheckoutError::StockInsufficient {
                        product_id: line.product_id.clone(),
                        requested: line.quantity,
                        available,
                    },
                });
            }

            debug!(
                sale_id = %sale.id,
                position = index,
                product_id = %line.product_id,
                quantity = line.quantity,
                "Line written"
            );

            lines.push(SaleLine {
                product_id: item.product_id,
                name,
                quantity: item.quantity,
                price: item.price,
            });
        }

        tx.commit()
            .await
            .map_err(|e| CheckoutError::persistence(CheckoutStep::Commit, None, e))?;

        Ok(SaleRecord { sale, lines })
    }
}

fn validate_line(line: &CartLine) -> Result<(), ValidationError> {
    validate_quantity(line.quantity)?;
    validate_price("unit_price", line.unit_price)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use counter_core::Product;

    fn product(id: &str, name: &str, cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            barcode: None,
            cost_price: Money::from_cents(cents / 2),
            price_sell: Money::from_cents(cents),
            stock_current: stock,
            category_id: None,
        }
    }

    async fn seeded(config: DbConfig) -> Database {
        let db = Database::new(config).await.unwrap();
        db.products().insert(&product("yerba", "Yerba 1kg", 1000, 10)).await.unwrap();
        db.products().insert(&product("bread", "Bread", 500, 10)).await.unwrap();
        db
    }

    async fn cart_of(db: &Database, items: &[(&str, i64)]) -> Cart {
        let mut cart = Cart::new();
        for (id, qty) in items {
            let p = db.products().get_by_id(id).await.unwrap().unwrap();
            cart.add(&p).unwrap();
            cart.set_quantity(id, *qty).unwrap();
        }
        cart
    }

    async fn stock(db: &Database, id: &str) -> i64 {
        db.products().stock_of(id).await.unwrap().unwrap()
    }

    async fn assert_nothing_persisted(db: &Database) {
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.sales().count_items().await.unwrap(), 0);
        assert_eq!(stock(db, "yerba").await, 10);
        assert_eq!(stock(db, "bread").await, 10);
    }

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("counter-checkout-{}.db", uuid::Uuid::new_v4()))
    }

    async fn remove_db(db: Database, path: &std::path::Path) {
        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_empty_cart_is_a_no_op() {
        let db = seeded(DbConfig::in_memory()).await;
        let result = db
            .checkout("till-1", PricePolicy::default())
            .checkout(&Cart::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_nothing_persisted(&db).await;
    }

    #[tokio::test]
    async fn test_checkout_commits_sale_items_and_decrements() {
        let db = seeded(DbConfig::in_memory()).await;
        let cart = cart_of(&db, &[("yerba", 2), ("bread", 1)]).await;

        let receipt = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap()
            .unwrap();

        assert!(!receipt.replayed);
        assert_eq!(receipt.total().cents(), 2500);
        assert_eq!(receipt.record.sale.terminal_id, "till-1");
        assert_eq!(receipt.record.sale.idempotency_key, cart.checkout_token().to_string());

        assert_eq!(db.sales().count().await.unwrap(), 1);
        let items = db.sales().get_items(receipt.sale_id()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, "yerba");
        assert_eq!((items[0].position, items[0].quantity, items[0].price.cents()), (0, 2, 1000));
        assert_eq!((items[1].position, items[1].quantity, items[1].price.cents()), (1, 1, 500));

        assert_eq!(stock(&db, "yerba").await, 8);
        assert_eq!(stock(&db, "bread").await, 9);

        let stored = db.sales().get_by_id(receipt.sale_id()).await.unwrap().unwrap();
        assert_eq!(stored, receipt.record.sale);
    }

    #[tokio::test]
    async fn test_retry_of_same_cart_replays_original_sale() {
        let db = seeded(DbConfig::in_memory()).await;
        let engine = db.checkout("till-1", PricePolicy::RejectStale);
        let cart = cart_of(&db, &[("yerba", 2)]).await;

        let first = engine.checkout(&cart).await.unwrap().unwrap();
        let second = engine.checkout(&cart).await.unwrap().unwrap();

        assert!(second.replayed);
        assert_eq!(second.record, first.record);
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(stock(&db, "yerba").await, 8);
    }

    #[tokio::test]
    async fn test_failure_between_item_insert_and_decrement_rolls_back() {
        let db = seeded(DbConfig::in_memory()).await;
        let engine = db.checkout("till-1", PricePolicy::RejectStale);
        let cart = cart_of(&db, &[("yerba", 2), ("bread", 1)]).await;

        sqlx::query(
            r#"
            CREATE TRIGGER fail_decrement BEFORE UPDATE OF stock_current ON products
            BEGIN
                SELECT RAISE(ABORT, 'simulated crash');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = engine.checkout(&cart).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Persistence {
                step: CheckoutStep::DecrementStock,
                line: Some(0),
                ..
            }
        ));
        assert_nothing_persisted(&db).await;

        sqlx::query("DROP TRIGGER fail_decrement")
            .execute(db.pool())
            .await
            .unwrap();

        let receipt = engine.checkout(&cart).await.unwrap().unwrap();
        assert!(!receipt.replayed);
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.sales().count_items().await.unwrap(), 2);
        assert_eq!(stock(&db, "yerba").await, 8);
        assert_eq!(stock(&db, "bread").await, 9);
    }

    #[tokio::test]
    async fn test_insufficient_stock_on_later_line_rolls_back_earlier_lines() {
        let db = seeded(DbConfig::in_memory()).await;
        let cart = cart_of(&db, &[("yerba", 2), ("bread", 3)]).await;

        // Another terminal sold bread meanwhile.
        sqlx::query("UPDATE products SET stock_current = 1 WHERE id = 'bread'")
            .execute(db.pool())
            .await
            .unwrap();

        let err = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap_err();

        match err {
            CheckoutError::StockInsufficient {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, "bread");
                assert_eq!(requested, 3);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(stock(&db, "yerba").await, 10);
        assert_eq!(stock(&db, "bread").await, 1);
    }

    #[tokio::test]
    async fn test_stale_price_policies() {
        let db = seeded(DbConfig::in_memory()).await;
        let cart = cart_of(&db, &[("yerba", 1)]).await;

        sqlx::query("UPDATE products SET price_sell = 1200 WHERE id = 'yerba'")
            .execute(db.pool())
            .await
            .unwrap();

        let err = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::PriceChanged { ref product_id, captured, current }
                if product_id == "yerba" && captured.cents() == 1000 && current.cents() == 1200
        ));
        assert_nothing_persisted(&db).await;

        let receipt = db
            .checkout("till-1", PricePolicy::Captured)
            .checkout(&cart)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.total().cents(), 1000);
        assert_eq!(receipt.record.lines[0].price.cents(), 1000);
    }

    #[tokio::test]
    async fn test_deleted_product_is_unavailable() {
        let db = seeded(DbConfig::in_memory()).await;
        let cart = cart_of(&db, &[("bread", 1), ("yerba", 1)]).await;
        db.products().delete("yerba").await.unwrap();

        let err = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductUnavailable(ref id) if id == "yerba"));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(stock(&db, "bread").await, 10);
    }

    #[tokio::test]
    async fn test_receipt_ticket() {
        let db = seeded(DbConfig::in_memory()).await;
        let cart = cart_of(&db, &[("yerba", 2), ("bread", 1)]).await;
        let receipt = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap()
            .unwrap();

        let ticket = receipt.ticket(&StoreIdentity::default());
        assert_eq!(ticket.reference, receipt.record.sale.short_ref());
        assert_eq!(ticket.total, "25.00");
        assert!(!ticket.is_reprint());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_terminals_racing_for_last_unit() {
        let path = temp_db_path();
        let db = Database::new(DbConfig::new(&path).max_connections(4)).await.unwrap();
        db.products().insert(&product("last", "Last One", 700, 1)).await.unwrap();

        let cart_a = cart_of(&db, &[("last", 1)]).await;
        let cart_b = cart_of(&db, &[("last", 1)]).await;
        let till_a = db.checkout("till-a", PricePolicy::RejectStale);
        let till_b = db.checkout("till-b", PricePolicy::RejectStale);

        let (a, b) = tokio::join!(till_a.checkout(&cart_a), till_b.checkout(&cart_b));

        let results = [a, b];
        let committed = results.iter().filter(|r| matches!(r, Ok(Some(_)))).count();
        let rejected = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(CheckoutError::StockInsufficient { available: 0, requested: 1, .. })
                )
            })
            .count();
        assert_eq!((committed, rejected), (1, 1));

        assert_eq!(stock(&db, "last").await, 0);
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.sales().count_items().await.unwrap(), 1);

        remove_db(db, &path).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_retries_of_same_cart_create_one_sale() {
        let path = temp_db_path();
        let db = seeded(DbConfig::new(&path).max_connections(4)).await;
        let cart = cart_of(&db, &[("yerba", 3)]).await;
        let engine = db.checkout("till-1", PricePolicy::RejectStale);

        let (a, b) = tokio::join!(engine.checkout(&cart), engine.checkout(&cart));
        let a = a.unwrap().unwrap();
        let b = b.unwrap().unwrap();

        assert_eq!(a.sale_id(), b.sale_id());
        assert!(a.replayed != b.replayed);
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(stock(&db, "yerba").await, 7);

        remove_db(db, &path).await;
    }

    #[test]
    fn test_price_policy_parsing() {
        assert_eq!("captured".parse::<PricePolicy>().unwrap(), PricePolicy::Captured);
        assert_eq!(" Reject_Stale ".parse::<PricePolicy>().unwrap(), PricePolicy::RejectStale);
        assert!("latest".parse::<PricePolicy>().is_err());
        assert_eq!(PricePolicy::default().to_string(), "reject_stale");
    }

    #[tokio::test]
    async fn test_receipt_serializes_for_the_screen() {
        let db = seeded(DbConfig::in_memory()).await;
        let cart = cart_of(&db, &[("bread", 1)]).await;
        let receipt = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap()
            .unwrap();

        let json = serde_json::to_value(&receipt.record).unwrap();
        assert_eq!(json["sale"]["total"], 500);
        assert_eq!(json["lines"][0]["name"], "Bread");
        assert_eq!(serde_json::to_value(PricePolicy::Captured).unwrap(), "captured");
    }
}
