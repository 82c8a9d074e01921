//! # Till Error Type
//!
//! Unified error type for till service operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Spaza POS                          │
//! │                                                                     │
//! │  Front-end                      Service layer                       │
//! │  ─────────                      ─────────────                       │
//! │                                                                     │
//! │  till.add_item(id, qty)                                             │
//! │         │                                                           │
//! │         ▼                                                           │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, TillError>                                         │  │
//! │  │       │                                                       │  │
//! │  │       ├── Business rule?  CoreError::InsufficientStock ──┐    │  │
//! │  │       │                                                  ▼    │  │
//! │  │       ├── Persistence?    DbError::UniqueViolation ── TillError│  │
//! │  │       │                                                       │  │
//! │  │       └── Success ────────────────────────────────────────────►  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                                                                     │
//! │  The front-end matches on the variant to pick a message:            │
//! │  "Only 3 in stock", "Till already reconciled", ...                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is a local, recoverable condition reported synchronously;
//! none is fatal to the process, and the failed operation has had no
//! partial effect on persisted state.

use thiserror::Error;

use spaza_core::{CoreError, ValidationError};
use spaza_db::DbError;

/// Error type returned by every till service operation.
#[derive(Debug, Error)]
pub enum TillError {
    /// A business rule or state-machine violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl TillError {
    /// True when the error is an insufficient-stock rejection.
    ///
    /// Front-ends branch on this to offer "sell what's left" flows.
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, TillError::Core(CoreError::InsufficientStock { .. }))
    }
}

/// Validation failures surface through the core error's wrapper variant.
impl From<ValidationError> for TillError {
    fn from(err: ValidationError) -> Self {
        TillError::Core(CoreError::Validation(err))
    }
}

/// Raw sqlx errors are categorized by the db layer on the way through.
impl From<sqlx::Error> for TillError {
    fn from(err: sqlx::Error) -> Self {
        TillError::Db(DbError::from(err))
    }
}

/// Result type for till service operations.
pub type TillResult<T> = Result<T, TillError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_passes_through_display() {
        let err: TillError = CoreError::EmptySale.into();
        assert_eq!(err.to_string(), "Cannot complete a sale with no items");
    }

    #[test]
    fn test_insufficient_stock_predicate() {
        let err: TillError = CoreError::InsufficientStock {
            name: "Cola 330ml Can".to_string(),
            available: 3,
            requested: 5,
        }
        .into();
        assert!(err.is_insufficient_stock());

        let other: TillError = CoreError::EmptySale.into();
        assert!(!other.is_insufficient_stock());
    }

    #[test]
    fn test_validation_error_wraps_into_core() {
        let err: TillError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(err, TillError::Core(CoreError::Validation(_))));
    }
}
