//! # Stock Repository
//!
//! Stock levels and the append-only movement audit trail.
//!
//! ## Atomicity Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  A stock change is TWO writes that must land together:              │
//! │                                                                     │
//! │    1. UPDATE products SET current_stock = <new>                     │
//! │    2. INSERT INTO stock_movements (prev, delta, new, ...)           │
//! │                                                                     │
//! │  The write helpers here take &mut SqliteConnection so the stock     │
//! │  ledger service wraps both in one transaction. A failure between    │
//! │  them rolls back: stock is never updated without its movement,      │
//! │  nor a movement recorded without its stock write.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements are append-only: there is no update or delete path in this
//! repository, and none may ever be added.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use spaza_core::StockMovement;

/// Columns selected for every movement query, in struct field order.
const MOVEMENT_COLUMNS: &str = "id, product_id, kind, quantity_delta, previous_stock, \
     resulting_stock, user_id, reason, sale_id, recorded_at";

/// Repository for stock levels and movement records.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Movement history for one product, newest first.
    pub async fn movements_for(
        &self,
        product_id: i64,
        limit: i64,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements \
             WHERE product_id = ?1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT ?2",
            MOVEMENT_COLUMNS
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Most recent movements across all products, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT ?1",
            MOVEMENT_COLUMNS
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements caused by one sale (the sale's stock footprint).
    pub async fn movements_for_sale(&self, sale_id: i64) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE sale_id = ?1 ORDER BY id",
            MOVEMENT_COLUMNS
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped writes (composed by the stock ledger)
    // -------------------------------------------------------------------------

    /// Reads a product's name and current stock inside a transaction.
    ///
    /// This is the authoritative read of the read-check-write cycle; it
    /// observes any earlier writes in the same transaction.
    pub async fn stock_of(
        conn: &mut SqliteConnection,
        product_id: i64,
    ) -> DbResult<Option<(String, i64)>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT name, current_stock FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Writes a product's new stock level.
    pub async fn set_stock(
        conn: &mut SqliteConnection,
        product_id: i64,
        new_stock: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, new_stock = %new_stock, "Writing stock level");

        let now = chrono::Utc::now();

        let result = sqlx::query(
            "UPDATE products SET current_stock = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(new_stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Appends a movement record, returning its assigned id.
    pub async fn insert_movement(
        conn: &mut SqliteConnection,
        movement: &StockMovement,
    ) -> DbResult<i64> {
        debug!(
            product_id = %movement.product_id,
            delta = %movement.quantity_delta,
            "Appending stock movement"
        );

        let result = sqlx::query(
            "INSERT INTO stock_movements ( \
                product_id, kind, quantity_delta, previous_stock, resulting_stock, \
                user_id, reason, sale_id, recorded_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(movement.product_id)
        .bind(movement.kind)
        .bind(movement.quantity_delta)
        .bind(movement.previous_stock)
        .bind(movement.resulting_stock)
        .bind(movement.user_id)
        .bind(&movement.reason)
        .bind(movement.sale_id)
        .bind(movement.recorded_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
