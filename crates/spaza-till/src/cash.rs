//! # Cash Manager
//!
//! Daily till management: opening float, withdrawal tracking, and the
//! end-of-day reconciliation against a physical cash count.
//!
//! ## Day State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 One Calendar Date of Till Life                      │
//! │                                                                     │
//! │  NotStarted ──start_day(opening)──► Started ──reconcile──► Reconciled│
//! │       │                               │                     (terminal)│
//! │       │                               ├── record_withdrawal          │
//! │       └── everything else fails       └── recompute_sales_totals     │
//! │           DayNotStarted                                             │
//! │                                                                     │
//! │  start_day twice        → DayAlreadyStarted (no-op)                 │
//! │  reconcile twice        → AlreadyReconciled (no-op)                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expected Closing
//! `expected = opening + cash_sales − withdrawals`. Card takings never sit
//! in the drawer, so they are tracked for reporting but excluded from the
//! expected figure. Reconcile always recomputes the sales totals first so
//! the variance is never measured against stale figures.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::TillResult;
use spaza_core::{CoreError, DailyCash, ValidationError, VarianceStatus};
use spaza_db::{Database, DbError};

/// Outcome of a till reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// The business date reconciled.
    pub business_date: NaiveDate,
    /// What the drawer should have held.
    pub expected_cents: i64,
    /// What the physical count found.
    pub actual_cents: i64,
    /// actual − expected.
    pub variance_cents: i64,
    /// Balanced, over or short.
    pub status: VarianceStatus,
}

/// Cash drawer service for the single till.
#[derive(Debug, Clone)]
pub struct CashManager {
    db: Database,
}

impl CashManager {
    /// Creates a new cash manager over the given database.
    pub fn new(db: Database) -> Self {
        CashManager { db }
    }

    /// Today's business date (UTC, consistent with sale timestamps).
    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    // -------------------------------------------------------------------------
    // Day lifecycle
    // -------------------------------------------------------------------------

    /// Starts today's business day with the counted opening float.
    ///
    /// Fails with `DayAlreadyStarted` if a record for today exists.
    pub async fn start_day(&self, opening_cents: i64, user_id: i64) -> TillResult<DailyCash> {
        if opening_cents < 0 {
            return Err(ValidationError::OutOfRange {
                field: "opening amount".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let today = Self::today();
        if self.db.cash().for_date(today).await?.is_some() {
            return Err(CoreError::DayAlreadyStarted(today).into());
        }

        self.db.cash().insert_day(today, opening_cents).await?;

        info!(
            date = %today,
            opening_cents = %opening_cents,
            user_id = %user_id,
            "Business day started"
        );

        self.db
            .cash()
            .for_date(today)
            .await?
            .ok_or_else(|| DbError::not_found("Daily cash record", today).into())
    }

    /// Re-derives cash/card sales totals for a date from persisted sales
    /// and recomputes the expected closing.
    ///
    /// Cash totals include the cash leg of mixed sales; card totals the
    /// card leg. Voided sales never count.
    pub async fn recompute_sales_totals(&self, date: NaiveDate) -> TillResult<DailyCash> {
        let mut record = self
            .db
            .cash()
            .for_date(date)
            .await?
            .ok_or(CoreError::DayNotStarted(date))?;

        let totals = self.db.sales().payment_totals_for_date(date).await?;
        let expected = record.opening_cents + totals.cash_cents - record.withdrawals_cents;

        self.db
            .cash()
            .update_totals(date, totals.cash_cents, totals.card_cents, expected)
            .await?;

        record.cash_sales_cents = totals.cash_cents;
        record.card_sales_cents = totals.card_cents;
        record.expected_closing_cents = expected;
        Ok(record)
    }

    /// Records cash taken out of the till (supplier payment, banking run).
    ///
    /// Fails with `DayNotStarted` when today has no day-start record.
    pub async fn record_withdrawal(
        &self,
        amount_cents: i64,
        reason: &str,
        user_id: i64,
    ) -> TillResult<DailyCash> {
        if amount_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "withdrawal amount".to_string(),
            }
            .into());
        }

        let today = Self::today();
        let mut record = self
            .db
            .cash()
            .for_date(today)
            .await?
            .ok_or(CoreError::DayNotStarted(today))?;

        let withdrawals = record.withdrawals_cents + amount_cents;
        let expected = record.opening_cents + record.cash_sales_cents - withdrawals;

        self.db
            .cash()
            .set_withdrawals(today, withdrawals, expected)
            .await?;

        info!(
            date = %today,
            amount_cents = %amount_cents,
            reason = %reason,
            user_id = %user_id,
            "Till withdrawal recorded"
        );

        record.withdrawals_cents = withdrawals;
        record.expected_closing_cents = expected;
        Ok(record)
    }

    /// Reconciles today's till against a physical cash count. Terminal.
    ///
    /// Always recomputes the sales totals first, so the variance is taken
    /// against fresh figures, then classifies the result as balanced,
    /// over or short.
    pub async fn reconcile(
        &self,
        actual_cents: i64,
        user_id: i64,
        notes: &str,
    ) -> TillResult<Reconciliation> {
        if actual_cents < 0 {
            return Err(ValidationError::OutOfRange {
                field: "actual amount".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let today = Self::today();
        let record = self.recompute_sales_totals(today).await?;

        if record.reconciled {
            return Err(CoreError::AlreadyReconciled(today).into());
        }

        let variance = actual_cents - record.expected_closing_cents;
        let status = VarianceStatus::classify(variance);

        self.db
            .cash()
            .mark_reconciled(today, actual_cents, variance, user_id, notes, Utc::now())
            .await?;

        info!(
            date = %today,
            expected_cents = %record.expected_closing_cents,
            actual_cents = %actual_cents,
            variance_cents = %variance,
            status = %status,
            "Till reconciled"
        );

        Ok(Reconciliation {
            business_date: today,
            expected_cents: record.expected_closing_cents,
            actual_cents,
            variance_cents: variance,
            status,
        })
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The raw record for a date, if the day was started.
    pub async fn daily_cash(&self, date: NaiveDate) -> TillResult<Option<DailyCash>> {
        Ok(self.db.cash().for_date(date).await?)
    }

    /// Today's record with freshly recomputed totals, for dashboards.
    /// `None` when the day has not been started.
    pub async fn cash_summary(&self) -> TillResult<Option<DailyCash>> {
        let today = Self::today();
        if self.db.cash().for_date(today).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.recompute_sales_totals(today).await?))
    }

    /// Recent daily records, newest first.
    pub async fn history(&self, days: i64) -> TillResult<Vec<DailyCash>> {
        Ok(self.db.cash().history(days).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
