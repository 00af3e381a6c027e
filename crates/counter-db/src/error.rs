//! # Database Error Types
//!
//! Error types for database operations and the checkout transaction.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError::Persistence { step, line, source }                     │
//! │       │                      ← which statement of the sale failed      │
//! │       ▼                                                                 │
//! │  TerminalSession ← cart kept, cashier may retry with the same token    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use counter_core::{CoreError, Money, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A second sale with the same idempotency key
    /// - Duplicate primary key on insert
    ///
    /// `field` is `table.column` as reported by SQLite.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Product referencing a non-existent category
    /// - Sale item referencing a non-existent sale
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint or trigger abort.
    ///
    /// ## When This Occurs
    /// - Stock would go negative
    /// - Category nested below a subcategory
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored rows violate a domain rule (e.g. a malformed category tree).
    #[error("Invalid stored data: {0}")]
    InvalidData(#[from] CoreError),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True if this is a UNIQUE violation on `table.column`.
    pub fn is_unique_violation_on(&self, table_column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field == table_column)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed")
                    || msg.contains("category depth exceeds")
                {
                    DbError::ConstraintViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Checkout Errors
// =============================================================================

/// The statement of the checkout sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    LookupExisting,
    BeginTransaction,
    InsertSale,
    CheckPrice,
    InsertSaleItem,
    DecrementStock,
    Commit,
    LoadReceipt,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStep::LookupExisting => "lookup existing sale",
            CheckoutStep::BeginTransaction => "begin transaction",
            CheckoutStep::InsertSale => "insert sale",
            CheckoutStep::CheckPrice => "check price",
            CheckoutStep::InsertSaleItem => "insert sale item",
            CheckoutStep::DecrementStock => "decrement stock",
            CheckoutStep::Commit => "commit",
            CheckoutStep::LoadReceipt => "load receipt",
        };
        f.write_str(name)
    }
}

/// Why a checkout did not produce a sale.
///
/// Every variant means nothing was persisted: the transaction was rolled
/// back (or never started) and the cart is still intact.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The conditional stock decrement was rejected.
    ///
    /// ## User Workflow
    /// ```text
    /// Terminal A and B both hold the last "Yerba 1kg" in their carts
    ///      │
    ///      ▼
    /// A commits first, stock → 0
    ///      │
    ///      ▼
    /// B: StockInsufficient { requested: 1, available: 0 }, B's cart kept
    /// ```
    #[error("Not enough stock for product {product_id}: requested {requested}, available {available}")]
    StockInsufficient {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// The product row no longer exists.
    #[error("Product {0} is no longer available")]
    ProductUnavailable(String),

    /// The live price differs from the price captured in the cart.
    #[error("Price of product {product_id} changed from {captured} to {current}")]
    PriceChanged {
        product_id: String,
        captured: Money,
        current: Money,
    },

    /// Storage failure at a known step. Not retried automatically.
    #[error("Checkout failed during {step}{}: {source}", line_suffix(.line))]
    Persistence {
        step: CheckoutStep,
        /// Index of the cart line being written, if any.
        line: Option<usize>,
        #[source]
        source: DbError,
    },

    /// Malformed cart line.
    #[error("Invalid cart line: {0}")]
    Validation(#[from] ValidationError),
}

impl CheckoutError {
    pub(crate) fn persistence(step: CheckoutStep, line: Option<usize>, source: impl Into<DbError>) -> Self {
        CheckoutError::Persistence {
            step,
            line,
            source: source.into(),
        }
    }

    /// True when the sale was rejected because of the catalog's current
    /// state (stock, price, deleted product) rather than a storage failure.
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            CheckoutError::StockInsufficient { .. }
                | CheckoutError::ProductUnavailable(_)
                | CheckoutError::PriceChanged { .. }
        )
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(index) => format!(" (line {})", index),
        None => String::new(),
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;
