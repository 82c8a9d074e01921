//! # spaza-db: Database Layer for Spaza POS
//!
//! This crate provides database access for the Spaza POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Spaza POS Data Flow                           │
//! │                                                                     │
//! │  Till service call (e.g. StockLedger::adjust)                       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    spaza-db (THIS CRATE)                      │  │
//! │  │                                                               │  │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌────────────────┐  │  │
//! │  │   │   Database   │   │ Repositories  │   │   Migrations   │  │  │
//! │  │   │  (pool.rs)   │   │ product.rs    │   │   (embedded)   │  │  │
//! │  │   │              │   │ sale.rs       │   │                │  │  │
//! │  │   │ SqlitePool   │◄──│ stock.rs      │   │ 001_initial_   │  │  │
//! │  │   │ WAL mode     │   │ cash.rs       │   │ schema.sql     │  │  │
//! │  │   └──────────────┘   └───────────────┘   └────────────────┘  │  │
//! │  │                                                               │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │                    SQLite database file                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction-Scoped Writes
//! Writes that must be atomic with other writes (stock update + movement
//! append, sale insert + line inserts) are exposed as associated functions
//! taking `&mut SqliteConnection`, so the service layer can compose them
//! inside a single `pool.begin()` transaction. Reads and standalone writes
//! are plain instance methods on the pool-holding repositories.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spaza_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/spaza.db")).await?;
//! let product = db.products().get_by_id(1).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cash::CashRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{PaymentTotals, SaleRepository};
pub use repository::stock::StockRepository;
