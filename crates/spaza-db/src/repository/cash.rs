//! # Daily Cash Repository
//!
//! Database operations for daily cash records (one row per business day).
//!
//! The state machine lives in the cash manager service; this repository
//! only persists the fields. The PRIMARY KEY on `business_date` backstops
//! the one-day-start-per-date rule at the storage layer.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use spaza_core::DailyCash;

/// Columns selected for every daily cash query, in struct field order.
const CASH_COLUMNS: &str = "business_date, opening_cents, cash_sales_cents, card_sales_cents, \
     withdrawals_cents, expected_closing_cents, actual_closing_cents, variance_cents, \
     reconciled, reconciled_by, reconciled_at, notes";

/// Repository for daily cash records.
#[derive(Debug, Clone)]
pub struct CashRepository {
    pool: SqlitePool,
}

impl CashRepository {
    /// Creates a new CashRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashRepository { pool }
    }

    /// Gets the record for one business date.
    pub async fn for_date(&self, date: NaiveDate) -> DbResult<Option<DailyCash>> {
        let sql = format!(
            "SELECT {} FROM daily_cash WHERE business_date = ?1",
            CASH_COLUMNS
        );
        let record = sqlx::query_as::<_, DailyCash>(&sql)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Inserts a day-start record. Expected closing starts at the opening
    /// float (no sales, no withdrawals yet).
    pub async fn insert_day(&self, date: NaiveDate, opening_cents: i64) -> DbResult<()> {
        debug!(date = %date, opening_cents = %opening_cents, "Starting business day");

        sqlx::query(
            "INSERT INTO daily_cash ( \
                business_date, opening_cents, cash_sales_cents, card_sales_cents, \
                withdrawals_cents, expected_closing_cents \
             ) VALUES (?1, ?2, 0, 0, 0, ?2)",
        )
        .bind(date)
        .bind(opening_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrites the derived sales totals and expected closing for a date.
    pub async fn update_totals(
        &self,
        date: NaiveDate,
        cash_sales_cents: i64,
        card_sales_cents: i64,
        expected_closing_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE daily_cash SET \
                cash_sales_cents = ?2, card_sales_cents = ?3, expected_closing_cents = ?4 \
             WHERE business_date = ?1",
        )
        .bind(date)
        .bind(cash_sales_cents)
        .bind(card_sales_cents)
        .bind(expected_closing_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Daily cash record", date));
        }

        Ok(())
    }

    /// Rewrites the withdrawals total and expected closing for a date.
    pub async fn set_withdrawals(
        &self,
        date: NaiveDate,
        withdrawals_cents: i64,
        expected_closing_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE daily_cash SET \
                withdrawals_cents = ?2, expected_closing_cents = ?3 \
             WHERE business_date = ?1",
        )
        .bind(date)
        .bind(withdrawals_cents)
        .bind(expected_closing_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Daily cash record", date));
        }

        Ok(())
    }

    /// Records the reconciliation outcome for a date.
    ///
    /// The `reconciled = 0` guard makes this one-shot at the storage layer;
    /// the cash manager checks first and reports `AlreadyReconciled`.
    pub async fn mark_reconciled(
        &self,
        date: NaiveDate,
        actual_closing_cents: i64,
        variance_cents: i64,
        user_id: i64,
        notes: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(date = %date, variance_cents = %variance_cents, "Reconciling till");

        let result = sqlx::query(
            "UPDATE daily_cash SET \
                actual_closing_cents = ?2, variance_cents = ?3, reconciled = 1, \
                reconciled_by = ?4, reconciled_at = ?5, notes = ?6 \
             WHERE business_date = ?1 AND reconciled = 0",
        )
        .bind(date)
        .bind(actual_closing_cents)
        .bind(variance_cents)
        .bind(user_id)
        .bind(at)
        .bind(notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Daily cash record (unreconciled)", date));
        }

        Ok(())
    }

    /// Recent daily cash records, newest first.
    pub async fn history(&self, days: i64) -> DbResult<Vec<DailyCash>> {
        let sql = format!(
            "SELECT {} FROM daily_cash \
             WHERE business_date >= DATE('now', ?1) \
             ORDER BY business_date DESC",
            CASH_COLUMNS
        );
        let records = sqlx::query_as::<_, DailyCash>(&sql)
            .bind(format!("-{} days", days))
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_day_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = Utc::now().date_naive();

        db.cash().insert_day(date, 10000).await.unwrap();

        let record = db.cash().for_date(date).await.unwrap().unwrap();
        assert_eq!(record.business_date, date);
        assert_eq!(record.opening_cents, 10000);
        assert_eq!(record.expected_closing_cents, 10000);
        assert_eq!(record.withdrawals_cents, 0);
        assert!(!record.reconciled);
        assert!(record.actual_closing_cents.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_day_rejected_by_primary_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = Utc::now().date_naive();

        db.cash().insert_day(date, 10000).await.unwrap();
        let err = db.cash().insert_day(date, 20000).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_totals_and_withdrawals_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = Utc::now().date_naive();
        db.cash().insert_day(date, 10000).await.unwrap();

        db.cash().update_totals(date, 5000, 3000, 15000).await.unwrap();
        db.cash().set_withdrawals(date, 2000, 13000).await.unwrap();

        let record = db.cash().for_date(date).await.unwrap().unwrap();
        assert_eq!(record.cash_sales_cents, 5000);
        assert_eq!(record.card_sales_cents, 3000);
        assert_eq!(record.withdrawals_cents, 2000);
        assert_eq!(record.expected_closing_cents, 13000);
    }

    #[tokio::test]
    async fn test_mark_reconciled_is_one_shot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = Utc::now().date_naive();
        db.cash().insert_day(date, 10000).await.unwrap();

        db.cash()
            .mark_reconciled(date, 10050, 50, 1, "fifty over", Utc::now())
            .await
            .unwrap();

        let record = db.cash().for_date(date).await.unwrap().unwrap();
        assert!(record.reconciled);
        assert_eq!(record.actual_closing_cents, Some(10050));
        assert_eq!(record.variance_cents, Some(50));
        assert_eq!(record.reconciled_by, Some(1));
        assert_eq!(record.notes, "fifty over");

        let err = db
            .cash()
            .mark_reconciled(date, 10050, 50, 1, "again", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_date_updates_fail() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = Utc::now().date_naive();

        assert!(db.cash().update_totals(date, 0, 0, 0).await.is_err());
        assert!(db.cash().set_withdrawals(date, 0, 0).await.is_err());
    }
}
