//! # Stock Ledger
//!
//! The ONLY component permitted to mutate `current_stock`. Every mutation
//! is paired with an appended movement record in the same SQLite
//! transaction, so stock and its audit trail cannot diverge.
//!
//! ## Read-Check-Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    One Ledger Operation                             │
//! │                                                                     │
//! │  BEGIN TRANSACTION                                                  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SELECT current_stock        ← authoritative value at call time     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  new = current + delta                                              │
//! │       │                                                             │
//! │       ├── new < 0 ──► ROLLBACK, InsufficientStock (no mutation)     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  UPDATE products SET current_stock = new                            │
//! │  INSERT INTO stock_movements (previous, delta, new, who, why)       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  COMMIT  ← stock and movement land together or not at all           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout and void reuse the same read-check-write step through the
//! `*_in` helpers, inside their own wider transactions.

use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{TillError, TillResult};
use spaza_core::validation::validate_quantity;
use spaza_core::{CoreError, MovementKind, Product, StockMovement};
use spaza_db::{Database, DbError, StockRepository};

/// Stock ledger service.
///
/// Cheap to clone; construct one per till session (or share freely).
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    /// Creates a new stock ledger over the given database.
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    // -------------------------------------------------------------------------
    // Mutations (each a single transaction)
    // -------------------------------------------------------------------------

    /// Applies a signed stock adjustment and appends its movement record.
    ///
    /// Fails with `InsufficientStock` when the delta would take stock below
    /// zero, checked against the in-transaction stock value before any
    /// write, so a rejection has no partial effect.
    pub async fn adjust(
        &self,
        product_id: i64,
        delta: i64,
        kind: MovementKind,
        user_id: i64,
        reason: &str,
    ) -> TillResult<StockMovement> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let movement =
            Self::apply_delta(&mut tx, product_id, delta, kind, user_id, reason, None).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %product_id,
            delta = %delta,
            resulting_stock = %movement.resulting_stock,
            "Stock adjusted"
        );
        Ok(movement)
    }

    /// Reduces stock for a completed sale line (kind = Sale).
    ///
    /// Standalone variant; checkout uses [`StockLedger::reduce_for_sale_in`]
    /// inside its own transaction instead.
    pub async fn reduce_for_sale(
        &self,
        product_id: i64,
        quantity: i64,
        sale_id: i64,
        user_id: i64,
    ) -> TillResult<StockMovement> {
        validate_quantity(quantity)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let movement =
            Self::reduce_for_sale_in(&mut tx, product_id, quantity, sale_id, user_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(movement)
    }

    /// Restores stock reversed out of a voided sale (kind = Adjustment).
    ///
    /// Restoring has no upper bound; putting units back is always safe.
    pub async fn restore_from_void(
        &self,
        product_id: i64,
        quantity: i64,
        user_id: i64,
        reason: &str,
    ) -> TillResult<StockMovement> {
        validate_quantity(quantity)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let movement = Self::apply_delta(
            &mut tx,
            product_id,
            quantity,
            MovementKind::Adjustment,
            user_id,
            reason,
            None,
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(product_id = %product_id, quantity = %quantity, "Stock restored from void");
        Ok(movement)
    }

    /// Receives stock into the shop (kind = Addition): deliveries,
    /// restocking, initial stock corrections.
    pub async fn receive_stock(
        &self,
        product_id: i64,
        quantity: i64,
        user_id: i64,
        reason: &str,
    ) -> TillResult<StockMovement> {
        validate_quantity(quantity)?;

        self.adjust(product_id, quantity, MovementKind::Addition, user_id, reason)
            .await
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Movement history for one product, newest first.
    pub async fn movements_for(
        &self,
        product_id: i64,
        limit: i64,
    ) -> TillResult<Vec<StockMovement>> {
        Ok(self.db.stock().movements_for(product_id, limit).await?)
    }

    /// Most recent movements across all products, newest first.
    pub async fn recent_movements(&self, limit: i64) -> TillResult<Vec<StockMovement>> {
        Ok(self.db.stock().recent(limit).await?)
    }

    /// Active products at or below their reorder threshold, most urgent
    /// (lowest stock) first.
    pub async fn low_stock(&self) -> TillResult<Vec<Product>> {
        Ok(self.db.products().low_stock().await?)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped steps (shared with checkout and void)
    // -------------------------------------------------------------------------

    /// The sale-reduction step, runnable inside a caller's transaction.
    pub(crate) async fn reduce_for_sale_in(
        conn: &mut SqliteConnection,
        product_id: i64,
        quantity: i64,
        sale_id: i64,
        user_id: i64,
    ) -> TillResult<StockMovement> {
        Self::apply_delta(
            conn,
            product_id,
            -quantity,
            MovementKind::Sale,
            user_id,
            "Sale transaction",
            Some(sale_id),
        )
        .await
    }

    /// The void-restoration step, runnable inside a caller's transaction.
    pub(crate) async fn restore_from_void_in(
        conn: &mut SqliteConnection,
        product_id: i64,
        quantity: i64,
        user_id: i64,
        reason: &str,
    ) -> TillResult<StockMovement> {
        Self::apply_delta(
            conn,
            product_id,
            quantity,
            MovementKind::Adjustment,
            user_id,
            reason,
            None,
        )
        .await
    }

    /// One read-check-write stock step: the single place stock changes.
    async fn apply_delta(
        conn: &mut SqliteConnection,
        product_id: i64,
        delta: i64,
        kind: MovementKind,
        user_id: i64,
        reason: &str,
        sale_id: Option<i64>,
    ) -> TillResult<StockMovement> {
        let (name, current) = StockRepository::stock_of(&mut *conn, product_id)
            .await?
            .ok_or_else(|| {
                TillError::Core(CoreError::ProductNotFound(product_id.to_string()))
            })?;

        let new_stock = current + delta;
        if new_stock < 0 {
            return Err(TillError::Core(CoreError::InsufficientStock {
                name,
                available: current,
                requested: -delta,
            }));
        }

        StockRepository::set_stock(&mut *conn, product_id, new_stock).await?;

        let mut movement = StockMovement {
            id: None,
            product_id,
            kind,
            quantity_delta: delta,
            previous_stock: current,
            resulting_stock: new_stock,
            user_id,
            reason: reason.to_string(),
            sale_id,
            recorded_at: chrono::Utc::now(),
        };
        let movement_id = StockRepository::insert_movement(&mut *conn, &movement).await?;
        movement.id = Some(movement_id);

        Ok(movement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use spaza_core::Category;
    use spaza_db::{DbConfig, ProductRepository};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, stock: i64) -> i64 {
        let now = Utc::now();
        let product = Product {
            id: None,
            name: "Cola 330ml Can".to_string(),
            barcode: None,
            category: Category::Cooldrinks,
            cost_price_cents: 750,
            sell_price_cents: 1199,
            current_stock: stock,
            min_stock: 5,
            vat_rate_bps: 1500,
            vat_inclusive: true,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        ProductRepository::insert(&mut conn, &product).await.unwrap()
    }

    async fn stock_of(db: &Database, id: i64) -> i64 {
        db.products()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .current_stock
    }

    #[tokio::test]
    async fn test_adjust_records_paired_movement() {
        let db = test_db().await;
        let id = seed_product(&db, 10).await;
        let ledger = StockLedger::new(db.clone());

        let movement = ledger
            .adjust(id, -4, MovementKind::Adjustment, 1, "damaged cans")
            .await
            .unwrap();

        assert_eq!(movement.previous_stock, 10);
        assert_eq!(movement.quantity_delta, -4);
        assert_eq!(movement.resulting_stock, 6);
        assert_eq!(
            movement.resulting_stock,
            movement.previous_stock + movement.quantity_delta
        );
        assert_eq!(stock_of(&db, id).await, 6);

        let history = ledger.movements_for(id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, "damaged cans");
    }

    #[tokio::test]
    async fn test_adjust_below_zero_has_no_effect() {
        let db = test_db().await;
        let id = seed_product(&db, 10).await;
        let ledger = StockLedger::new(db.clone());

        let err = ledger
            .adjust(id, -11, MovementKind::Adjustment, 1, "impossible")
            .await
            .unwrap_err();
        assert!(err.is_insufficient_stock());

        // Stock untouched, no movement recorded
        assert_eq!(stock_of(&db, id).await, 10);
        assert!(ledger.movements_for(id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reduce_for_sale_boundaries() {
        let db = test_db().await;
        let id = seed_product(&db, 10).await;
        let ledger = StockLedger::new(db.clone());

        // Selling exactly the stock on hand succeeds
        let movement = ledger.reduce_for_sale(id, 10, 77, 1).await.unwrap();
        assert_eq!(movement.kind, MovementKind::Sale);
        assert_eq!(movement.sale_id, Some(77));
        assert_eq!(movement.resulting_stock, 0);

        // One more unit fails and leaves zero stock alone
        let err = ledger.reduce_for_sale(id, 1, 78, 1).await.unwrap_err();
        assert!(err.is_insufficient_stock());
        assert_eq!(stock_of(&db, id).await, 0);
    }

    #[tokio::test]
    async fn test_restore_from_void_is_unbounded() {
        let db = test_db().await;
        let id = seed_product(&db, 2).await;
        let ledger = StockLedger::new(db.clone());

        // Far beyond any previous level: restoring is always safe
        let movement = ledger
            .restore_from_void(id, 500, 1, "Stock restored from voided sale TXN-TEST0001")
            .await
            .unwrap();
        assert_eq!(movement.kind, MovementKind::Adjustment);
        assert_eq!(movement.resulting_stock, 502);
        assert_eq!(stock_of(&db, id).await, 502);
    }

    #[tokio::test]
    async fn test_receive_stock() {
        let db = test_db().await;
        let id = seed_product(&db, 3).await;
        let ledger = StockLedger::new(db.clone());

        let movement = ledger
            .receive_stock(id, 24, 1, "Tuesday delivery")
            .await
            .unwrap();
        assert_eq!(movement.kind, MovementKind::Addition);
        assert_eq!(stock_of(&db, id).await, 27);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;
        let ledger = StockLedger::new(db.clone());

        let err = ledger
            .adjust(404, 1, MovementKind::Addition, 1, "nope")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TillError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stock_never_negative_across_sequence() {
        let db = test_db().await;
        let id = seed_product(&db, 5).await;
        let ledger = StockLedger::new(db.clone());

        let deltas: [i64; 6] = [-3, -3, 4, -2, -10, -1];
        for delta in deltas {
            // Some of these fail; the invariant must hold regardless
            let _ = ledger
                .adjust(id, delta, MovementKind::Adjustment, 1, "churn")
                .await;
            assert!(stock_of(&db, id).await >= 0);
        }

        // Every recorded movement is internally consistent
        for m in ledger.movements_for(id, 50).await.unwrap() {
            assert_eq!(m.resulting_stock, m.previous_stock + m.quantity_delta);
            assert!(m.resulting_stock >= 0);
        }
    }

    #[tokio::test]
    async fn test_low_stock_via_ledger() {
        let db = test_db().await;
        let id = seed_product(&db, 10).await; // min_stock = 5
        let ledger = StockLedger::new(db.clone());

        assert!(ledger.low_stock().await.unwrap().is_empty());

        ledger
            .adjust(id, -6, MovementKind::Adjustment, 1, "shrinkage")
            .await
            .unwrap();

        let low = ledger.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].current_stock, 4);
    }
}
