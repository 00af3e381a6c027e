//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Catalog snapshot loads (all products, or only sellable ones)
//! - Lookups by id and barcode
//! - Catalog management inserts
//!
//! Stock is only ever decreased by the checkout engine, inside the sale
//! transaction. This repository never writes `stock_current` after insert.
//!
//! ## Sellable Snapshot
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                                  list_sellable()              │
//! │  ─────────────────────────────────         ─────────────────────────    │
//! │  Yerba 1kg      stock 12          ──►      Bread                        │
//! │  Bread          stock 3           ──►      Yerba 1kg                    │
//! │  Milk 1L        stock 0           ✗        (ordered by name)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use counter_core::validation::{validate_barcode, validate_name, validate_price, validate_stock};
use counter_core::{CoreError, Product};

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str =
    "id, name, barcode, cost_price, price_sell, stock_current, category_id";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let on_sale = repo.list_sellable().await?;
/// let product = repo.get_by_barcode("7790001000012").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products ordered by name, including those out of stock.
    ///
    /// Used for inventory valuation and catalog management.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY name, id", PRODUCT_COLUMNS);
        let products: Vec<Product> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Loaded all products");
        Ok(products)
    }

    /// Products with stock left, ordered by name. This is what a terminal
    /// offers for sale.
    pub async fn list_sellable(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE stock_current > 0 ORDER BY name, id",
            PRODUCT_COLUMNS
        );
        let products: Vec<Product> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Loaded sellable products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by exact barcode (scanner input).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE barcode = ?1 ORDER BY name LIMIT 1",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The inserted product
    /// * `Err(DbError::InvalidData)` - Empty name, negative price or stock
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown category
    /// * `Err(DbError::UniqueViolation)` - Id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_name("name", &product.name).map_err(CoreError::from)?;
        validate_barcode(product.barcode.as_deref()).map_err(CoreError::from)?;
        validate_price("price_sell", product.price_sell).map_err(CoreError::from)?;
        validate_price("cost_price", product.cost_price).map_err(CoreError::from)?;
        validate_stock(product.stock_current).map_err(CoreError::from)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, cost_price, price_sell, stock_current, category_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.cost_price)
        .bind(product.price_sell)
        .bind(product.stock_current)
        .bind(&product.category_id)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Deletes a product. Past sales keep their items and show a
    /// placeholder name.
    ///
    /// ## Returns
    /// * `Ok(())` - Product deleted
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Current stock of a product, `None` if it doesn't exist.
    pub async fn stock_of(&self, id: &str) -> DbResult<Option<i64>> {
        let stock = sqlx::query_scalar("SELECT stock_current FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
