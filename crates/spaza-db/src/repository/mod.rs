//! # Repository Module
//!
//! Database repository implementations for Spaza POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                     │
//! │                                                                     │
//! │  Till service                                                       │
//! │       │                                                             │
//! │       │  db.products().get_by_barcode("6001234567890")              │
//! │       ▼                                                             │
//! │  ProductRepository                                                  │
//! │  ├── get_by_id(&self, id)             ← pool-based reads            │
//! │  ├── search(&self, term)                                            │
//! │  ├── insert(conn, product)            ← transaction-scoped writes   │
//! │  └── delete(conn, id)                   (composable by services)    │
//! │       │                                                             │
//! │       │  SQL query                                                  │
//! │       ▼                                                             │
//! │  SQLite database                                                    │
//! │                                                                     │
//! │  Benefits:                                                          │
//! │  • SQL is isolated in one place                                     │
//! │  • Atomic multi-write operations compose in the service layer       │
//! │  • Easy to test against an in-memory database                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product catalog rows
//! - [`sale::SaleRepository`] - Sales and their line items
//! - [`stock::StockRepository`] - Stock levels and the movement audit trail
//! - [`cash::CashRepository`] - Daily cash records

pub mod cash;
pub mod product;
pub mod sale;
pub mod stock;
