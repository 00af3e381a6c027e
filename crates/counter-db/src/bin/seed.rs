//! # Seed Data Generator
//!
//! Populates a terminal database with a small demo store for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named in the terminal config
//! cargo run -p counter-db --bin seed
//!
//! # Specify database path
//! cargo run -p counter-db --bin seed -- --db ./data/counter.db
//!
//! # Also ring up one sale and print its ticket
//! cargo run -p counter-db --bin seed -- --demo-sale
//! ```
//!
//! ## Generated Data
//! - Two root categories, each with two child categories
//! - A few dozen products spread over them, some uncategorized, some
//!   out of stock
//! - Store identity for the ticket header

use std::env;
use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use counter_core::{Category, Money, Product, StoreIdentity};
use counter_db::repository::product::generate_product_id;
use counter_db::{AppConfig, Database, TerminalSession};

/// (root id, root name, [(child id, child name)])
const CATEGORIES: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "drinks",
        "Drinks",
        &[("drinks-soft", "Soft Drinks"), ("drinks-hot", "Hot Drinks")],
    ),
    (
        "pantry",
        "Pantry",
        &[("pantry-dry", "Dry Goods"), ("pantry-bakery", "Bakery")],
    ),
];

/// (category, name, cost cents, sell cents, stock)
const PRODUCTS: &[(Option<&str>, &str, i64, i64, i64)] = &[
    (Some("drinks-soft"), "Cola 500ml", 60, 120, 48),
    (Some("drinks-soft"), "Cola 2L", 150, 280, 12),
    (Some("drinks-soft"), "Lemon Soda 500ml", 55, 110, 30),
    (Some("drinks-soft"), "Sparkling Water 1L", 40, 90, 0),
    (Some("drinks-hot"), "Ground Coffee 250g", 320, 590, 8),
    (Some("drinks-hot"), "Yerba Mate 1kg Premium", 410, 760, 15),
    (Some("drinks-hot"), "Black Tea 25 bags", 120, 230, 3),
    (Some("drinks"), "Orange Juice 1L", 130, 250, 20),
    (Some("pantry-dry"), "Rice 1kg", 90, 170, 40),
    (Some("pantry-dry"), "Spaghetti 500g", 70, 140, 36),
    (Some("pantry-dry"), "Lentils 400g", 80, 160, 2),
    (Some("pantry-bakery"), "White Bread", 110, 220, 10),
    (Some("pantry-bakery"), "Croissant", 45, 95, 24),
    (Some("pantry"), "Olive Oil 500ml", 450, 790, 6),
    (None, "Lighter", 30, 80, 50),
    (None, "Batteries AA x4", 210, 399, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut demo_sale = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--demo-sale" => demo_sale = true,
            "--help" | "-h" => {
                println!("Counter POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: from config)");
                println!("  -c, --config <PATH>   Terminal config file");
                println!("      --demo-sale       Ring up one sale and print its ticket");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(path = ?config.database.path, "Opening database");
    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
    } else {
        seed(&db).await?;
    }

    if demo_sale {
        ring_up_demo_sale(&db, &config).await?;
    }

    let valuation = db
        .inventory_valuation(config.inventory.low_stock_threshold)
        .await?;
    info!(
        products = valuation.product_count,
        invested = %valuation.invested,
        potential = %valuation.potential,
        low_stock = valuation.low_stock_count,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

async fn seed(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let categories = db.categories();
    for (root_id, root_name, children) in CATEGORIES {
        categories.insert(&Category::root(*root_id, *root_name)).await?;
        for (child_id, child_name) in children.iter() {
            categories
                .insert(&Category::child(*child_id, *child_name, *root_id))
                .await?;
        }
    }

    let products = db.products();
    for (idx, (category, name, cost, sell, stock)) in PRODUCTS.iter().enumerate() {
        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            // Every third product is sold by name only.
            barcode: (idx % 3 != 2).then(|| format!("779{:010}", idx + 1)),
            cost_price: Money::from_cents(*cost),
            price_sell: Money::from_cents(*sell),
            stock_current: *stock,
            category_id: category.map(str::to_string),
        };

        if let Err(e) = products.insert(&product).await {
            warn!(name = %product.name, error = %e, "Failed to insert product");
        }
    }

    db.store()
        .upsert(&StoreIdentity {
            name: "Corner Market".to_string(),
            address: "12 Main Street".to_string(),
            phone: "555-0142".to_string(),
            ..StoreIdentity::default()
        })
        .await?;

    info!(
        categories = CATEGORIES.len(),
        products = PRODUCTS.len(),
        "Demo store seeded"
    );
    Ok(())
}

async fn ring_up_demo_sale(
    db: &Database,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut till = TerminalSession::from_config(db.clone(), config);
    let catalog = till.catalog().await?;

    for entry in catalog.entries().iter().take(3) {
        till.add(&entry.product)?;
    }

    let Some(receipt) = till.checkout().await? else {
        warn!("Nothing in stock to sell");
        return Ok(());
    };

    let store = db.store().get_or_default().await?;
    let ticket = receipt.ticket(&store);

    println!();
    for line in ticket.render(config.receipt.paper_width) {
        println!("{line}");
    }
    println!();
    println!("{}", ticket.to_json()?);

    Ok(())
}
