//! # spaza-core: Pure Business Logic for Spaza POS
//!
//! This crate is the **heart** of Spaza POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Spaza POS Architecture                         │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │            Front-end (GUI / CLI, out of tree)                 │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │                spaza-till (Service Layer)                     │  │
//! │  │   StockLedger, TransactionManager, CashManager, Catalog      │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │              ★ spaza-core (THIS CRATE) ★                      │  │
//! │  │                                                               │  │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────────┐   │  │
//! │  │   │  types   │  │  money   │  │   sale   │  │ validation │   │  │
//! │  │   │ Product  │  │  Money   │  │   Sale   │  │   rules    │   │  │
//! │  │   │ Movement │  │ VatRate  │  │ SaleLine │  │   checks   │   │  │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └────────────┘   │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │                 spaza-db (Database Layer)                     │  │
//! │  │           SQLite queries, migrations, repositories            │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, DailyCash, enums)
//! - [`sale`] - Sale and SaleLine with derived totals and payment math
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use spaza_core::Money` instead of
// `use spaza_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sale::{Sale, SaleLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default VAT rate in basis points (1500 = 15.0%, the South African rate)
///
/// Products default to this rate; the settings collaborator can override it
/// per shop via `ShopConfig` in spaza-till.
pub const DEFAULT_VAT_RATE_BPS: u32 = 1500;

/// Maximum distinct lines allowed in a single sale
///
/// Prevents runaway sales and keeps receipts printable on till paper.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single line in a sale
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
