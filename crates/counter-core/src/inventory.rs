//! # Inventory Valuation
//!
//! Dashboard figures computed from a product snapshot.
//!
//! ```text
//! invested          = Σ cost_price × stock_current
//! potential         = Σ price_sell × stock_current
//! potential_profit  = potential − invested
//! low_stock_count   = #products with stock_current < threshold
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Product;

/// Products with fewer units than this are reported as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryValuation {
    /// Money tied up in stock, at cost.
    pub invested: Money,
    /// Revenue if all stock sold at current prices.
    pub potential: Money,
    pub potential_profit: Money,
    pub product_count: usize,
    pub low_stock_count: usize,
}

/// Values a product snapshot.
pub fn value_inventory(products: &[Product], low_stock_threshold: i64) -> InventoryValuation {
    let mut valuation = InventoryValuation {
        product_count: products.len(),
        ..InventoryValuation::default()
    };

    for product in products {
        valuation.invested += product.cost_price.multiply_quantity(product.stock_current);
        valuation.potential += product.price_sell.multiply_quantity(product.stock_current);
        if product.stock_current < low_stock_threshold {
            valuation.low_stock_count += 1;
        }
    }

    valuation.potential_profit = valuation.potential - valuation.invested;
    valuation
}

/// Products below the threshold, fewest units first.
pub fn low_stock(products: &[Product], low_stock_threshold: i64) -> Vec<&Product> {
    let mut low: Vec<&Product> = products
        .iter()
        .filter(|p| p.stock_current < low_stock_threshold)
        .collect();
    low.sort_by(|a, b| a.stock_current.cmp(&b.stock_current).then_with(|| a.name.cmp(&b.name)));
    low
}
