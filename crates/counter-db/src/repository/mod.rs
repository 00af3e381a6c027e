//! # Repository Module
//!
//! Database repository implementations for Counter POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  TerminalSession / seed                                                │
//! │       │                                                                 │
//! │       │  db.products().list_sellable()                                 │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list_all / list_sellable                                          │
//! │  ├── get_by_id / get_by_barcode                                        │
//! │  └── insert / delete                                                   │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that belong to a sale do not go through a repository handle:   │
//! │  they run on the checkout transaction's connection.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product reads and inserts
//! - [`CategoryRepository`](category::CategoryRepository) - Category hierarchy
//! - [`SaleRepository`](sale::SaleRepository) - Sale and sale item reads
//! - [`StoreRepository`](store::StoreRepository) - Ticket header settings

pub mod category;
pub mod product;
pub mod sale;
pub mod store;
