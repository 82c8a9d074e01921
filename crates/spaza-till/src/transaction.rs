//! # Transaction Manager
//!
//! Stages a sale in memory, enforces stock and payment feasibility, and
//! makes it durable, atomically, on completion.
//!
//! ## Checkout Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    complete_sale()                                  │
//! │                                                                     │
//! │  Guards (sale stays open, nothing touched):                         │
//! │    empty line list      → EmptySale                                 │
//! │    cash + card < total  → InvalidPayment                            │
//! │                                                                     │
//! │  BEGIN TRANSACTION                                                  │
//! │    INSERT sale row                                                  │
//! │    INSERT line rows                                                 │
//! │    for each line:                                                   │
//! │      read stock (authoritative, in-transaction)                     │
//! │      fail InsufficientStock if short  ──► ROLLBACK EVERYTHING       │
//! │      UPDATE stock + INSERT movement                                 │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Only after COMMIT does the builder clear its working slot. A       │
//! │  rollback leaves the sale open in memory and the database exactly   │
//! │  as it was: there is no partially-completed state.                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The add-time stock checks are advisory (they read the live ledger value
//! at call time so the cashier hears about shortages early); the checks
//! inside the completion transaction are the authoritative ones.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{TillError, TillResult};
use crate::ledger::StockLedger;
use spaza_core::validation::{validate_quantity, validate_tendered_cents};
use spaza_core::{
    CoreError, PaymentMethod, Product, Sale, SaleLine, ValidationError, MAX_SALE_LINES,
};
use spaza_db::{Database, DbError, SaleRepository};

/// Transaction builder service: owns the one in-progress sale.
///
/// Single-operator model: one open sale at a time. Starting a new sale
/// discards any open one (an abandoned sale leaves no trace anywhere).
#[derive(Debug)]
pub struct TransactionManager {
    db: Database,
    current: Option<Sale>,
}

impl TransactionManager {
    /// Creates a new transaction manager over the given database.
    pub fn new(db: Database) -> Self {
        TransactionManager { db, current: None }
    }

    // -------------------------------------------------------------------------
    // Staging (valid while a sale is open)
    // -------------------------------------------------------------------------

    /// Starts a new sale for the given cashier, discarding any open one.
    pub fn start_new_sale(&mut self, user_id: i64) -> &Sale {
        let sale = Sale::new(user_id);
        debug!(transaction_ref = %sale.transaction_ref, user_id = %user_id, "Sale started");
        self.current.insert(sale)
    }

    /// Discards the open sale without trace.
    pub fn abandon_sale(&mut self) {
        if let Some(sale) = self.current.take() {
            debug!(transaction_ref = %sale.transaction_ref, "Sale abandoned");
        }
    }

    /// The open sale, if any.
    pub fn current_sale(&self) -> Option<&Sale> {
        self.current.as_ref()
    }

    /// Adds a product to the open sale.
    ///
    /// The quantity is checked against the live ledger stock at call time,
    /// not against what other lines have staged, and a product already in
    /// the sale merges into its existing line, re-validating the combined
    /// quantity rather than creating a duplicate.
    pub async fn add_item(&mut self, product_id: i64, quantity: i64) -> TillResult<()> {
        validate_quantity(quantity)?;
        if self.current.is_none() {
            return Err(CoreError::NoActiveSale.into());
        }

        let product = self.fetch_sellable(product_id).await?;
        let pid = product
            .id
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let Some(sale) = self.current.as_mut() else {
            return Err(CoreError::NoActiveSale.into());
        };

        let staged = sale.quantity_of(pid);
        let combined = staged + quantity;
        validate_quantity(combined)?;

        if combined > product.current_stock {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.current_stock,
                requested: combined,
            }
            .into());
        }

        if staged > 0 {
            sale.set_line_quantity(pid, combined);
        } else {
            if sale.lines.len() >= MAX_SALE_LINES {
                return Err(ValidationError::OutOfRange {
                    field: "sale lines".to_string(),
                    min: 0,
                    max: MAX_SALE_LINES as i64,
                }
                .into());
            }
            sale.push_line(SaleLine::snapshot(pid, &product, quantity));
        }

        debug!(product_id = %pid, quantity = %quantity, "Item added to sale");
        Ok(())
    }

    /// Resolves a barcode to a product and adds it to the open sale.
    pub async fn add_item_by_barcode(&mut self, barcode: &str, quantity: i64) -> TillResult<()> {
        let product = self
            .db
            .products()
            .get_by_barcode(barcode)
            .await?
            .filter(|p| !p.archived)
            .ok_or_else(|| CoreError::ProductNotFound(barcode.to_string()))?;
        let pid = product
            .id
            .ok_or_else(|| CoreError::ProductNotFound(barcode.to_string()))?;

        self.add_item(pid, quantity).await
    }

    /// Removes a product's line entirely, regardless of quantity.
    pub fn remove_item(&mut self, product_id: i64) -> TillResult<()> {
        let Some(sale) = self.current.as_mut() else {
            return Err(CoreError::NoActiveSale.into());
        };
        sale.remove_line(product_id);
        Ok(())
    }

    /// Rewrites a line's quantity; zero or below removes the line.
    pub async fn update_item_quantity(
        &mut self,
        product_id: i64,
        new_quantity: i64,
    ) -> TillResult<()> {
        if new_quantity <= 0 {
            return self.remove_item(product_id);
        }

        validate_quantity(new_quantity)?;
        if self.current.is_none() {
            return Err(CoreError::NoActiveSale.into());
        }

        let product = self.fetch_sellable(product_id).await?;

        if new_quantity > product.current_stock {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.current_stock,
                requested: new_quantity,
            }
            .into());
        }

        let Some(sale) = self.current.as_mut() else {
            return Err(CoreError::NoActiveSale.into());
        };
        if !sale.set_line_quantity(product_id, new_quantity) {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        Ok(())
    }

    /// Records the tendered amounts on the open sale and computes change
    /// (see [`Sale::set_payment`] for the per-method rules).
    pub fn set_payment(
        &mut self,
        method: PaymentMethod,
        cash_cents: i64,
        card_cents: i64,
    ) -> TillResult<()> {
        validate_tendered_cents(cash_cents)?;
        validate_tendered_cents(card_cents)?;

        let Some(sale) = self.current.as_mut() else {
            return Err(CoreError::NoActiveSale.into());
        };
        sale.set_payment(method, cash_cents, card_cents);
        Ok(())
    }

    /// True iff the tendered amounts cover the open sale's total.
    pub fn validate_payment(&self) -> TillResult<bool> {
        let Some(sale) = self.current.as_ref() else {
            return Err(CoreError::NoActiveSale.into());
        };
        Ok(sale.validate_payment())
    }

    // -------------------------------------------------------------------------
    // Completion and void
    // -------------------------------------------------------------------------

    /// Persists the open sale and reduces stock, as one atomic unit.
    ///
    /// Returns the assigned sale id. On any failure the database is
    /// untouched and the sale remains open in the builder.
    pub async fn complete_sale(&mut self) -> TillResult<i64> {
        let sale = self.current.as_ref().ok_or(CoreError::NoActiveSale)?;

        if sale.is_empty() {
            return Err(CoreError::EmptySale.into());
        }
        if !sale.validate_payment() {
            return Err(CoreError::InvalidPayment {
                tendered_cents: sale.cash_tendered_cents + sale.card_tendered_cents,
                total_cents: sale.total_cents(),
            }
            .into());
        }

        let sale = sale.clone();

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let sale_id = SaleRepository::insert_with_lines(&mut tx, &sale).await?;
        for line in &sale.lines {
            StockLedger::reduce_for_sale_in(
                &mut tx,
                line.product_id,
                line.quantity,
                sale_id,
                sale.user_id,
            )
            .await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale_id,
            transaction_ref = %sale.transaction_ref,
            total_cents = %sale.total_cents(),
            items = %sale.item_count(),
            "Sale completed"
        );

        self.current = None;
        Ok(sale_id)
    }

    /// Voids a completed sale: marks it voided and restores every line's
    /// quantity, as one atomic unit. Terminal and irreversible.
    ///
    /// Never fails on stock limits; restoring is unbounded.
    pub async fn void_sale(&self, sale_id: i64, user_id: i64, reason: &str) -> TillResult<()> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or(CoreError::SaleNotFound(sale_id))?;

        if sale.voided {
            return Err(CoreError::AlreadyVoided(sale_id).into());
        }

        let restore_reason = format!("Stock restored from voided sale {}", sale.transaction_ref);

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        SaleRepository::mark_voided(&mut tx, sale_id, user_id, reason, Utc::now()).await?;
        for line in &sale.lines {
            StockLedger::restore_from_void_in(
                &mut tx,
                line.product_id,
                line.quantity,
                user_id,
                &restore_reason,
            )
            .await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale_id,
            transaction_ref = %sale.transaction_ref,
            reason = %reason,
            "Sale voided"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Loads a persisted sale with its lines.
    pub async fn sale_by_id(&self, sale_id: i64) -> TillResult<Option<Sale>> {
        Ok(self.db.sales().get_by_id(sale_id).await?)
    }

    /// Non-voided sales for one date, newest first.
    pub async fn sales_for_date(&self, date: chrono::NaiveDate) -> TillResult<Vec<Sale>> {
        Ok(self.db.sales().sales_for_date(date).await?)
    }

    /// All sales (voided included) in an inclusive date range.
    pub async fn sales_in_range(
        &self,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> TillResult<Vec<Sale>> {
        Ok(self.db.sales().get_by_date_range(start, end).await?)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Resolves a product that may be sold (exists and not archived).
    async fn fetch_sellable(&self, product_id: i64) -> TillResult<Product> {
        self.db
            .products()
            .get_by_id(product_id)
            .await?
            .filter(|p| !p.archived)
            .ok_or_else(|| TillError::Core(CoreError::ProductNotFound(product_id.to_string())))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spaza_core::{Category, MovementKind};
    use spaza_db::{DbConfig, ProductRepository};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(
        db: &Database,
        name: &str,
        barcode: Option<&str>,
        sell_price_cents: i64,
        stock: i64,
    ) -> i64 {
        let now = Utc::now();
        let product = Product {
            id: None,
            name: name.to_string(),
            barcode: barcode.map(|b| b.to_string()),
            category: Category::Food,
            cost_price_cents: sell_price_cents / 2,
            sell_price_cents,
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
    async fn test_sell_seven_units_cash_exact() {
        // stock 10, sell 7 for cash with exact tender:
        // sale completes, stock drops to 3, one Sale movement of -7
        let db = test_db().await;
        let id = seed_product(&db, "Maize Meal 2.5kg", None, 3899, 10).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 7).await.unwrap();

        let total = till.current_sale().unwrap().total_cents();
        till.set_payment(PaymentMethod::Cash, total, 0).unwrap();
        assert!(till.validate_payment().unwrap());

        let sale_id = till.complete_sale().await.unwrap();

        assert_eq!(stock_of(&db, id).await, 3);
        assert!(till.current_sale().is_none());

        let movements = db.stock().movements_for_sale(sale_id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Sale);
        assert_eq!(movements[0].quantity_delta, -7);

        let persisted = till.sale_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(persisted.total_cents(), total);
        assert_eq!(persisted.change_cents, 0);
    }

    #[tokio::test]
    async fn test_oversell_rejected_without_trace() {
        let db = test_db().await;
        let id = seed_product(&db, "Sugar 1kg", None, 2499, 10).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        let err = till.add_item(id, 11).await.unwrap_err();
        assert!(err.is_insufficient_stock());

        assert_eq!(stock_of(&db, id).await, 10);
        assert!(db.stock().movements_for(id, 10).await.unwrap().is_empty());
        assert!(till.current_sale().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_boundary_exact_stock() {
        let db = test_db().await;
        let id = seed_product(&db, "Eggs 6-pack", None, 2199, 10).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        // Exactly the stock on hand is fine
        till.add_item(id, 10).await.unwrap();
        // One more unit (merged to 11) is not
        let err = till.add_item(id, 1).await.unwrap_err();
        assert!(err.is_insufficient_stock());
        assert_eq!(till.current_sale().unwrap().quantity_of(id), 10);
    }

    #[tokio::test]
    async fn test_same_product_merges_into_one_line() {
        let db = test_db().await;
        let id = seed_product(&db, "Cola 330ml Can", None, 1199, 48).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 2).await.unwrap();
        till.add_item(id, 3).await.unwrap();

        let sale = till.current_sale().unwrap();
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(sale.quantity_of(id), 5);
        assert_eq!(sale.total_cents(), 1199 * 5);
    }

    #[tokio::test]
    async fn test_add_by_barcode() {
        let db = test_db().await;
        let id = seed_product(&db, "Chips 36g", Some("6009876543210"), 799, 60).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item_by_barcode("6009876543210", 2).await.unwrap();
        assert_eq!(till.current_sale().unwrap().quantity_of(id), 2);

        let err = till
            .add_item_by_barcode("0000000000000", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TillError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_archived_product_cannot_be_sold() {
        let db = test_db().await;
        let id = seed_product(&db, "Old Stock", None, 999, 10).await;
        db.products().set_archived(id, true).await.unwrap();

        let mut till = TransactionManager::new(db.clone());
        till.start_new_sale(1);
        let err = till.add_item(id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            TillError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_quantity_and_remove() {
        let db = test_db().await;
        let id = seed_product(&db, "Candles 6-pack", None, 1699, 22).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 2).await.unwrap();

        till.update_item_quantity(id, 6).await.unwrap();
        assert_eq!(till.current_sale().unwrap().quantity_of(id), 6);
        assert_eq!(till.current_sale().unwrap().total_cents(), 1699 * 6);

        // More than stock is rejected
        let err = till.update_item_quantity(id, 23).await.unwrap_err();
        assert!(err.is_insufficient_stock());

        // Zero removes the line
        till.update_item_quantity(id, 0).await.unwrap();
        assert!(till.current_sale().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_empty_sale_rejected() {
        let db = test_db().await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        let err = till.complete_sale().await.unwrap_err();
        assert!(matches!(err, TillError::Core(CoreError::EmptySale)));
    }

    #[tokio::test]
    async fn test_insufficient_payment_leaves_sale_open() {
        let db = test_db().await;
        let id = seed_product(&db, "Rice 2kg", None, 4299, 12).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 1).await.unwrap();
        // One cent short
        till.set_payment(PaymentMethod::Cash, 4298, 0).unwrap();
        assert!(!till.validate_payment().unwrap());

        let err = till.complete_sale().await.unwrap_err();
        assert!(matches!(
            err,
            TillError::Core(CoreError::InvalidPayment { .. })
        ));

        // Sale still open, nothing persisted, stock untouched
        assert!(till.current_sale().is_some());
        assert_eq!(stock_of(&db, id).await, 12);
        let today = Utc::now().date_naive();
        assert!(till.sales_for_date(today).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_payment_persists_change() {
        // total R100.00, card R60 + cash R50 => change R10.00
        let db = test_db().await;
        let id = seed_product(&db, "Gift Hamper", None, 10000, 5).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 1).await.unwrap();
        till.set_payment(PaymentMethod::Mixed, 5000, 6000).unwrap();

        let sale_id = till.complete_sale().await.unwrap();
        let persisted = till.sale_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(persisted.payment_method, PaymentMethod::Mixed);
        assert_eq!(persisted.change_cents, 1000);
    }

    #[tokio::test]
    async fn test_void_restores_stock_and_is_one_shot() {
        let db = test_db().await;
        let bread = seed_product(&db, "White Bread 700g", None, 1899, 24).await;
        let milk = seed_product(&db, "Milk Long-life 1L", None, 1999, 30).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(bread, 3).await.unwrap();
        till.add_item(milk, 2).await.unwrap();
        let total = till.current_sale().unwrap().total_cents();
        till.set_payment(PaymentMethod::Cash, total, 0).unwrap();
        let sale_id = till.complete_sale().await.unwrap();

        assert_eq!(stock_of(&db, bread).await, 21);
        assert_eq!(stock_of(&db, milk).await, 28);

        till.void_sale(sale_id, 2, "customer returned goods")
            .await
            .unwrap();

        // Stock back to pre-sale levels
        assert_eq!(stock_of(&db, bread).await, 24);
        assert_eq!(stock_of(&db, milk).await, 30);

        // Sale marked, metadata recorded
        let voided = till.sale_by_id(sale_id).await.unwrap().unwrap();
        assert!(voided.voided);
        assert_eq!(voided.voided_by, Some(2));
        assert_eq!(voided.void_reason, "customer returned goods");

        // Restoration movements are adjustments naming the sale ref
        let history = db.stock().movements_for(bread, 10).await.unwrap();
        let restore = history
            .iter()
            .find(|m| m.kind == MovementKind::Adjustment)
            .unwrap();
        assert_eq!(restore.quantity_delta, 3);
        assert!(restore.reason.contains(&voided.transaction_ref));

        // Second void fails and changes nothing
        let err = till.void_sale(sale_id, 2, "again").await.unwrap_err();
        assert!(matches!(
            err,
            TillError::Core(CoreError::AlreadyVoided(_))
        ));
        assert_eq!(stock_of(&db, bread).await, 24);
        assert_eq!(stock_of(&db, milk).await, 30);
    }

    #[tokio::test]
    async fn test_void_unknown_sale() {
        let db = test_db().await;
        let till = TransactionManager::new(db.clone());
        let err = till.void_sale(404, 1, "nope").await.unwrap_err();
        assert!(matches!(err, TillError::Core(CoreError::SaleNotFound(404))));
    }

    #[tokio::test]
    async fn test_completion_rolls_back_when_stock_moved_underfoot() {
        // The add-time check passed, then stock dropped before checkout.
        // The in-transaction check catches it and NOTHING lands: no sale
        // row, no lines, no movements, no stock change.
        let db = test_db().await;
        let id = seed_product(&db, "Last Items", None, 1000, 5).await;
        let ledger = StockLedger::new(db.clone());
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 5).await.unwrap();

        // Shrinkage recorded between add and checkout
        ledger
            .adjust(id, -1, MovementKind::Adjustment, 9, "shrinkage")
            .await
            .unwrap();

        till.set_payment(PaymentMethod::Cash, 5000, 0).unwrap();
        let err = till.complete_sale().await.unwrap_err();
        assert!(err.is_insufficient_stock());

        // Database exactly as before the attempt
        assert_eq!(stock_of(&db, id).await, 4);
        let today = Utc::now().date_naive();
        assert!(till.sales_for_date(today).await.unwrap().is_empty());
        let movements = db.stock().movements_for(id, 10).await.unwrap();
        assert_eq!(movements.len(), 1); // only the shrinkage adjustment

        // Sale is still open; the cashier can fix the quantity and retry
        assert!(till.current_sale().is_some());
        till.update_item_quantity(id, 4).await.unwrap();
        till.set_payment(PaymentMethod::Cash, 4000, 0).unwrap();
        till.complete_sale().await.unwrap();
        assert_eq!(stock_of(&db, id).await, 0);
    }

    #[tokio::test]
    async fn test_operations_require_active_sale() {
        let db = test_db().await;
        let mut till = TransactionManager::new(db.clone());

        let err = till.add_item(1, 1).await.unwrap_err();
        assert!(matches!(err, TillError::Core(CoreError::NoActiveSale)));
        assert!(till.remove_item(1).is_err());
        assert!(till.set_payment(PaymentMethod::Cash, 100, 0).is_err());
        assert!(till.validate_payment().is_err());
    }

    #[tokio::test]
    async fn test_abandon_leaves_no_trace() {
        let db = test_db().await;
        let id = seed_product(&db, "Lollipop", None, 100, 200).await;
        let mut till = TransactionManager::new(db.clone());

        till.start_new_sale(1);
        till.add_item(id, 10).await.unwrap();
        till.abandon_sale();

        assert!(till.current_sale().is_none());
        assert_eq!(stock_of(&db, id).await, 200);
        let today = Utc::now().date_naive();
        assert!(till.sales_for_date(today).await.unwrap().is_empty());
    }
}
