//! # Sale Repository
//!
//! Database operations for sales and their line items.
//!
//! ## Persistence Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  sales            one row per transaction                           │
//! │    └── sale_items one row per line, owned by the sale               │
//! │                                                                     │
//! │  NO TOTAL COLUMNS on sales: subtotal, VAT and grand total are       │
//! │  derived from sale_items on every read (Sale accessors in memory,   │
//! │  SUM(total_cents) in aggregation SQL). Stored totals can drift      │
//! │  from their lines; derived ones cannot.                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Completed sales are immutable except for the void transition, which
//! flips the voided flag and records who/when/why.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use spaza_core::{Sale, SaleLine};

/// Columns selected for every sale query, in struct field order.
const SALE_COLUMNS: &str = "id, transaction_ref, date_time, user_id, payment_method, \
     cash_tendered_cents, card_tendered_cents, change_cents, \
     voided, voided_by, voided_at, void_reason";

/// Columns selected for every line query, in struct field order.
const LINE_COLUMNS: &str =
    "product_id, name_snapshot, quantity, unit_price_cents, total_cents, vat_rate_bps";

/// Cash/card takings for one business day, derived from persisted sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTotals {
    /// Cash takings: totals of cash sales + the cash leg of mixed sales.
    pub cash_cents: i64,
    /// Card takings: totals of card sales + the card leg of mixed sales.
    pub card_cents: i64,
}

/// Raw aggregation row before the mixed legs are folded in.
#[derive(Debug, sqlx::FromRow)]
struct RawPaymentTotals {
    cash_total: i64,
    card_total: i64,
    mixed_cash: i64,
    mixed_card: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a sale with its lines by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(mut sale) => {
                sale.lines = self.lines_for(id).await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// All sales (voided included) whose date falls in the inclusive range,
    /// newest first. Reporting consumers filter as they see fit.
    pub async fn get_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales \
             WHERE DATE(date_time) BETWEEN ?1 AND ?2 \
             ORDER BY date_time DESC",
            SALE_COLUMNS
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(sales).await
    }

    /// Non-voided sales for one date, newest first.
    pub async fn sales_for_date(&self, date: NaiveDate) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales \
             WHERE DATE(date_time) = ?1 AND voided = 0 \
             ORDER BY date_time DESC",
            SALE_COLUMNS
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(sales).await
    }

    /// Derives cash/card takings for a date from non-voided sales.
    ///
    /// Cash-method and card-method sales contribute their grand totals
    /// (summed from their lines); mixed sales contribute their cash and
    /// card tendered legs to the respective sides.
    pub async fn payment_totals_for_date(&self, date: NaiveDate) -> DbResult<PaymentTotals> {
        let raw = sqlx::query_as::<_, RawPaymentTotals>(
            "SELECT \
                COALESCE(SUM(CASE WHEN s.payment_method = 'cash' THEN t.total_cents ELSE 0 END), 0) AS cash_total, \
                COALESCE(SUM(CASE WHEN s.payment_method = 'card' THEN t.total_cents ELSE 0 END), 0) AS card_total, \
                COALESCE(SUM(CASE WHEN s.payment_method = 'mixed' THEN s.cash_tendered_cents ELSE 0 END), 0) AS mixed_cash, \
                COALESCE(SUM(CASE WHEN s.payment_method = 'mixed' THEN s.card_tendered_cents ELSE 0 END), 0) AS mixed_card \
             FROM sales s \
             JOIN (SELECT sale_id, SUM(total_cents) AS total_cents \
                   FROM sale_items GROUP BY sale_id) t ON t.sale_id = s.id \
             WHERE DATE(s.date_time) = ?1 AND s.voided = 0",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaymentTotals {
            cash_cents: raw.cash_total + raw.mixed_cash,
            card_cents: raw.card_total + raw.mixed_card,
        })
    }

    /// Loads the lines for one sale, in insertion order.
    async fn lines_for(&self, sale_id: i64) -> DbResult<Vec<SaleLine>> {
        let sql = format!(
            "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY id",
            LINE_COLUMNS
        );
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Attaches lines to a batch of sale rows.
    async fn hydrate(&self, mut sales: Vec<Sale>) -> DbResult<Vec<Sale>> {
        for sale in &mut sales {
            if let Some(id) = sale.id {
                sale.lines = self.lines_for(id).await?;
            }
        }
        Ok(sales)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped writes (composed by the transaction manager)
    // -------------------------------------------------------------------------

    /// Inserts a sale and all its lines, returning the assigned sale id.
    ///
    /// Takes a connection so checkout can pair this with the per-line stock
    /// reductions in one transaction.
    pub async fn insert_with_lines(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<i64> {
        debug!(transaction_ref = %sale.transaction_ref, lines = sale.lines.len(), "Inserting sale");

        let result = sqlx::query(
            "INSERT INTO sales ( \
                transaction_ref, date_time, user_id, payment_method, \
                cash_tendered_cents, card_tendered_cents, change_cents, \
                voided, voided_by, voided_at, void_reason \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&sale.transaction_ref)
        .bind(sale.date_time)
        .bind(sale.user_id)
        .bind(sale.payment_method)
        .bind(sale.cash_tendered_cents)
        .bind(sale.card_tendered_cents)
        .bind(sale.change_cents)
        .bind(sale.voided)
        .bind(sale.voided_by)
        .bind(sale.voided_at)
        .bind(&sale.void_reason)
        .execute(&mut *conn)
        .await?;

        let sale_id = result.last_insert_rowid();

        for line in &sale.lines {
            sqlx::query(
                "INSERT INTO sale_items ( \
                    sale_id, product_id, name_snapshot, quantity, \
                    unit_price_cents, total_cents, vat_rate_bps \
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(&line.name_snapshot)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.total_cents)
            .bind(line.vat_rate_bps)
            .execute(&mut *conn)
            .await?;
        }

        Ok(sale_id)
    }

    /// Marks a sale voided with audit metadata.
    ///
    /// The `voided = 0` guard makes the transition one-shot at the storage
    /// layer as well; the service checks first and reports `AlreadyVoided`.
    pub async fn mark_voided(
        conn: &mut SqliteConnection,
        sale_id: i64,
        user_id: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Marking sale voided");

        let result = sqlx::query(
            "UPDATE sales SET \
                voided = 1, voided_by = ?2, voided_at = ?3, void_reason = ?4 \
             WHERE id = ?1 AND voided = 0",
        )
        .bind(sale_id)
        .bind(user_id)
        .bind(at)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (unvoided)", sale_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
