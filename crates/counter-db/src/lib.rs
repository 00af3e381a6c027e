//! # counter-db: Storage and Checkout for Counter POS
//!
//! SQLite access for the Counter POS system, via sqlx. Besides the plain
//! repositories this crate owns the two pieces that need a transaction:
//! the checkout engine and the sales history reader.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Counter POS Data Flow                            │
//! │                                                                         │
//! │  Terminal screen (out of scope)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   counter-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │TerminalSession│───►│CheckoutEngine │    │ SalesHistory │  │   │
//! │  │   │ (session.rs)  │    │ (checkout.rs) │    │ (history.rs) │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────┬───────┘  │   │
//! │  │           │                    │                   │          │   │
//! │  │   ┌───────┴────────────────────┴───────────────────┴───────┐  │   │
//! │  │   │      Database (pool.rs) + Repositories + Migrations     │  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   shared by every terminal on the machine                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and checkout error types
//! - [`repository`] - Products, categories, sales, store settings
//! - [`checkout`] - Atomic, idempotent checkout transaction
//! - [`history`] - Sales history and ticket reprints
//! - [`session`] - Per-terminal cart + checkout
//! - [`config`] - TOML/env terminal configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use counter_db::{AppConfig, Database, TerminalSession};
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let mut till = TerminalSession::from_config(db.clone(), &config);
//! let catalog = till.catalog().await?;
//! till.add(catalog.by_barcode("7790001").unwrap())?;
//!
//! if let Some(receipt) = till.checkout().await? {
//!     let store = db.store().get_or_default().await?;
//!     for line in receipt.ticket(&store).render(config.receipt.paper_width) {
//!         println!("{line}");
//!     }
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod history;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutEngine, CheckoutReceipt, PricePolicy};
pub use config::{AppConfig, ConfigError};
pub use error::{CheckoutError, CheckoutStep, DbError};
pub use history::SalesHistory;
pub use pool::{Database, DbConfig};
pub use session::TerminalSession;

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::store::StoreRepository;
