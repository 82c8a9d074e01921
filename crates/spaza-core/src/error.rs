//! # Error Types
//!
//! Domain-specific error types for spaza-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  spaza-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  spaza-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  spaza-till errors (service crate)                                  │
//! │  └── TillError        - Core | Db, what callers see                 │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → TillError → front-end          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (name, quantities, dates)
//! 3. Errors are enum variants, never String
//! 4. Every variant is a local, recoverable condition; none is fatal

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations or state-machine violations.
/// State-machine violations (`AlreadyVoided`, `AlreadyReconciled`,
/// `DayAlreadyStarted`) leave state completely unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id or barcode did not resolve (absent or archived).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds quantity on hand at check time.
    ///
    /// Reported before any mutation; callers must re-read stock before
    /// retrying with the same quantity.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Tendered amounts do not cover the sale total.
    #[error("Payment insufficient: tendered {tendered_cents} cents, total {total_cents} cents")]
    InvalidPayment {
        tendered_cents: i64,
        total_cents: i64,
    },

    /// `complete` called on a sale with no line items.
    #[error("Cannot complete a sale with no items")]
    EmptySale,

    /// A sale operation was invoked with no sale open in the builder.
    #[error("No active sale. Start a new sale first")]
    NoActiveSale,

    /// Sale id did not resolve.
    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// Void requested on a sale that is already voided. No-op.
    #[error("Sale {0} is already voided")]
    AlreadyVoided(i64),

    /// A day-start already exists for the date. No-op.
    #[error("Business day {0} already started")]
    DayAlreadyStarted(NaiveDate),

    /// A till operation requires a day-start record that does not exist.
    #[error("No business day started for {0}")]
    DayNotStarted(NaiveDate),

    /// Reconcile requested for a date that is already reconciled. No-op.
    #[error("Till for {0} already reconciled")]
    AlreadyReconciled(NaiveDate),

    /// Hard delete refused: the product has sale or movement history.
    /// Archive it instead.
    #[error("Product {0} has sale or movement history and cannot be deleted; archive it instead")]
    ProductHasHistory(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements, and are raised
/// before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
