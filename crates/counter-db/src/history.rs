//! # Sales History Reader
//!
//! Read-only access to committed sales, most recent first, with their lines
//! and product names resolved.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales ─────────┐                                                       │
//! │                 ▼                                                       │
//! │  sale_items ── LEFT JOIN products ──► SaleRecord { sale, lines }        │
//! │                   (name or "(deleted product)")    │                    │
//! │                                                    ▼                    │
//! │                                   format_ticket(.., Reprint)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales and lines are read inside one read transaction so the two queries
//! see the same snapshot.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::debug;

use counter_core::receipt::{format_ticket, Ticket, TicketKind, TicketSource};
use counter_core::{Money, Sale, SaleLine, SaleRecord, StoreIdentity};

use crate::error::DbResult;

/// Name shown for lines whose product has since been deleted.
pub const DELETED_PRODUCT_NAME: &str = "(deleted product)";

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    sale_id: String,
    product_id: String,
    name: Option<String>,
    quantity: i64,
    price: Money,
}

impl From<LineRow> for SaleLine {
    fn from(row: LineRow) -> Self {
        SaleLine {
            product_id: row.product_id,
            name: row
                .name
                .unwrap_or_else(|| DELETED_PRODUCT_NAME.to_string()),
            quantity: row.quantity,
            price: row.price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SalesHistory {
    pool: SqlitePool,
}

impl SalesHistory {
    pub fn new(pool: SqlitePool) -> Self {
        SalesHistory { pool }
    }

    /// Sales ordered by `created_at` descending (ties: later insert first),
    /// each with its lines in cart order.
    ///
    /// `limit = None` returns every sale.
    pub async fn list(&self, limit: Option<u32>) -> DbResult<Vec<SaleRecord>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);

        let mut tx = self.pool.begin().await?;

        let sales: Vec<Sale> = sqlx::query_as(
            r#"
            SELECT id, created_at, total, terminal_id, idempotency_key
            FROM sales
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let rows: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT si.sale_id, si.product_id, p.name, si.quantity, si.price
            FROM sale_items si
            LEFT JOIN products p ON p.id = si.product_id
            WHERE si.sale_id IN (
                SELECT id FROM sales ORDER BY created_at DESC, rowid DESC LIMIT ?1
            )
            ORDER BY si.sale_id, si.position
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut lines_by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
        for row in rows {
            lines_by_sale
                .entry(row.sale_id.clone())
                .or_default()
                .push(row.into());
        }

        let records: Vec<SaleRecord> = sales
            .into_iter()
            .map(|sale| {
                let lines = lines_by_sale.remove(&sale.id).unwrap_or_default();
                SaleRecord { sale, lines }
            })
            .collect();

        debug!(count = records.len(), "Loaded sales history");
        Ok(records)
    }

    /// One sale with its lines.
    pub async fn get(&self, sale_id: &str) -> DbResult<Option<SaleRecord>> {
        let mut tx = self.pool.begin().await?;

        let sale: Option<Sale> = sqlx::query_as(
            "SELECT id, created_at, total, terminal_id, idempotency_key FROM sales WHERE id = ?1",
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        let rows: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT si.sale_id, si.product_id, p.name, si.quantity, si.price
            FROM sale_items si
            LEFT JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = ?1
            ORDER BY si.position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(SaleRecord {
            sale,
            lines: rows.into_iter().map(SaleLine::from).collect(),
        }))
    }

    /// Formats a committed sale as a reprint, dated with the sale's own
    /// timestamp.
    pub async fn reprint(&self, sale_id: &str, store: &StoreIdentity) -> DbResult<Option<Ticket>> {
        let Some(record) = self.get(sale_id).await? else {
            return Ok(None);
        };

        debug!(sale_id = %sale_id, "Reprinting ticket");
        Ok(Some(format_ticket(
            store,
            &TicketSource::from(&record),
            record.sale.created_at,
            TicketKind::Reprint,
        )))
    }
}
