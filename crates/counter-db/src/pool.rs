//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Process Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Shared by every TerminalSession                                │
//! │       ▼                                                                 │
//! │  Terminal 1 checkout ──► Conn1 (write lock)                            │
//! │  Terminal 2 checkout ──► Conn2 (waits up to busy_timeout)              │
//! │  Terminal 3 catalog  ──► Conn3 (WAL: reads never block)                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so catalog loads and
//! history reads never wait for a checkout in progress. Writers are still
//! serialized by SQLite; `busy_timeout` is how long a second checkout waits
//! for the write lock.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use counter_core::catalog::Catalog;
use counter_core::inventory::{value_inventory, InventoryValuation};

use crate::checkout::{CheckoutEngine, PricePolicy};
use crate::error::{DbError, DbResult};
use crate::history::SalesHistory;
use crate::migrations;
use crate::repository::category::CategoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::store::StoreRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/counter.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file shared by every terminal on this machine, or `:memory:`.
    pub database_path: PathBuf,

    /// Default 5, a handful of terminals per store.
    pub max_connections: u32,

    pub min_connections: u32,

    /// How long `pool.acquire()` waits for a free connection.
    pub acquire_timeout: Duration,

    pub idle_timeout: Duration,

    /// How long a second writer waits for SQLite's write lock before the
    /// statement fails with `SQLITE_BUSY`. Default 5 seconds.
    pub busy_timeout: Duration,

    /// Apply embedded migrations in `Database::new`. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration. The file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory database for tests, gone when the pool closes.
    ///
    /// Each SQLite connection to `:memory:` opens its own database, so the
    /// pool is pinned to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone (the pool is reference counted). Every terminal session
/// holds a clone.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./counter.db")).await?;
///
/// let catalog = db.load_catalog().await?;
/// let recent = db.history().list(Some(20)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool (WAL, foreign keys on, busy timeout set on every
    /// connection) and applies migrations unless disabled.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Called by `new()` unless disabled.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries not covered by a repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn store(&self) -> StoreRepository {
        StoreRepository::new(self.pool.clone())
    }

    pub fn history(&self) -> SalesHistory {
        SalesHistory::new(self.pool.clone())
    }

    /// Checkout engine bound to one terminal id.
    pub fn checkout(&self, terminal_id: impl Into<String>, policy: PricePolicy) -> CheckoutEngine {
        CheckoutEngine::new(self.pool.clone(), terminal_id, policy)
    }

    /// Loads the sellable catalog snapshot: products with stock, and the
    /// full category tree, both ordered by name.
    pub async fn load_catalog(&self) -> DbResult<Catalog> {
        let products = self.products().list_sellable().await?;
        let categories = self.categories().list_all().await?;

        let catalog = Catalog::build(products, categories)?;
        debug!(entries = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Values all stock, including out-of-stock products.
    pub async fn inventory_valuation(&self, low_stock_threshold: i64) -> DbResult<InventoryValuation> {
        let products = self.products().list_all().await?;
        Ok(value_inventory(&products, low_stock_threshold))
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
