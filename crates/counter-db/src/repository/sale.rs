//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction, see checkout.rs)                        │
//! │     └── insert_sale()  → Sale { idempotency_key = cart token }         │
//! │     └── insert_item()  → SaleItem (position 0)                         │
//! │     └── insert_item()  → SaleItem (position 1)                         │
//! │     └── COMMIT                                                         │
//! │                                                                         │
//! │  2. READ-ONLY FOREVER                                                  │
//! │     └── get_by_id() / find_by_idempotency_key() / get_items()          │
//! │                                                                         │
//! │  There is no update or delete path for sales.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use counter_core::{Sale, SaleItem};

use crate::error::DbResult;

const SALE_COLUMNS: &str = "id, created_at, total, terminal_id, idempotency_key";

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets the sale produced by a checkout token, if any.
    pub async fn find_by_idempotency_key(&self, key: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE idempotency_key = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale in cart order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items: Vec<SaleItem> = sqlx::query_as(
            r#"
            SELECT id, sale_id, position, product_id, quantity, price
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts committed sales (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts sale items across all sales.
    pub async fn count_items(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transactional Writes
// =============================================================================
// These take a connection so the checkout engine can run them inside its
// transaction.

/// Inserts a sale row.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total = %sale.total, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (id, created_at, total, terminal_id, idempotency_key)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&sale.id)
    .bind(format_timestamp(sale.created_at))
    .bind(sale.total)
    .bind(&sale.terminal_id)
    .bind(&sale.idempotency_key)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a sale item. The price is frozen from this point on.
pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    debug!(
        sale_id = %item.sale_id,
        position = item.position,
        product_id = %item.product_id,
        "Inserting sale item"
    );

    sqlx::query(
        r#"
        INSERT INTO sale_items (id, sale_id, position, product_id, quantity, price)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(item.position)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.price)
    .execute(conn)
    .await?;

    Ok(())
}

/// Current time at the precision stored in `sales.created_at`.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text (microseconds, `Z`), so that text order in
/// SQLite equals time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 14, 3, 22).unwrap();
        let text = format_timestamp(whole);
        assert_eq!(text, "2024-05-01T14:03:22.000000Z");
        assert_eq!(format_timestamp(now_timestamp()).len(), text.len());
    }

    #[test]
    fn test_now_timestamp_round_trips_through_text() {
        let at = now_timestamp();
        let parsed = DateTime::parse_from_rfc3339(&format_timestamp(at))
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, at);
    }

    #[tokio::test]
    async fn test_find_by_idempotency_key() {
        use crate::checkout::PricePolicy;
        use crate::pool::{Database, DbConfig};
        use counter_core::cart::Cart;
        use counter_core::{Money, Product};

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bread = Product {
            id: "bread".to_string(),
            name: "Bread".to_string(),
            barcode: None,
            cost_price: Money::from_cents(200),
            price_sell: Money::from_cents(350),
            stock_current: 4,
            category_id: None,
        };
        db.products().insert(&bread).await.unwrap();

        let mut cart = Cart::new();
        cart.add(&bread).unwrap();
        let key = cart.checkout_token().to_string();
        assert!(db.sales().find_by_idempotency_key(&key).await.unwrap().is_none());

        let receipt = db
            .checkout("till-1", PricePolicy::RejectStale)
            .checkout(&cart)
            .await
            .unwrap()
            .unwrap();

        let sale = db.sales().find_by_idempotency_key(&key).await.unwrap().unwrap();
        assert_eq!(sale.id, receipt.sale_id());
        assert_eq!(sale.total.cents(), 350);
        assert_eq!(db.sales().get_items(&sale.id).await.unwrap().len(), 1);
    }
}
