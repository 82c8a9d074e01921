//! # Catalog Service
//!
//! Product lifecycle: create, update, archive/restore, delete.
//!
//! ## Deletion Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Removing a Product                               │
//! │                                                                     │
//! │  No sale lines, no movements:                                       │
//! │    delete_product(..., force: false)  → row removed                 │
//! │                                                                     │
//! │  Has history (normal operation):                                    │
//! │    delete_product(..., force: false)  → ProductHasHistory           │
//! │    archive_product(...)               → hidden, history intact      │
//! │                                                                     │
//! │  Has history (force, admin-only by caller policy):                  │
//! │    delete_product(..., force: true)   → remaining stock written     │
//! │      off with a Deletion movement, row removed. Old sale lines      │
//! │      and movements keep their product_id as a tolerated orphan;     │
//! │      the audit trail outlives the product.                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog updates never touch `current_stock`; that column belongs to the
//! stock ledger. The one exception is product creation, where the opening
//! quantity is recorded together with its Addition movement in the same
//! transaction.

use chrono::Utc;
use tracing::info;

use crate::config::ShopConfig;
use crate::error::{TillError, TillResult};
use spaza_core::validation::{
    validate_barcode, validate_min_stock, validate_price_cents, validate_product_name,
    validate_vat_rate_bps,
};
use spaza_core::{Category, CoreError, MovementKind, Product, StockMovement, ValidationError};
use spaza_db::{Database, DbError, ProductRepository, StockRepository};

/// Product catalog service.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
    config: ShopConfig,
}

impl Catalog {
    /// Creates a new catalog over the given database and shop settings.
    pub fn new(db: Database, config: ShopConfig) -> Self {
        Catalog { db, config }
    }

    /// A blank product template carrying the shop's VAT defaults.
    pub fn new_product(&self, name: &str, category: Category) -> Product {
        let now = Utc::now();
        Product {
            id: None,
            name: name.to_string(),
            barcode: None,
            category,
            cost_price_cents: 0,
            sell_price_cents: 0,
            current_stock: 0,
            min_stock: 0,
            vat_rate_bps: self.config.default_vat_rate_bps,
            vat_inclusive: self.config.vat_inclusive_default,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Creates a product, logging its opening quantity as an Addition
    /// movement in the same transaction when stock > 0.
    pub async fn create_product(&self, product: &Product, user_id: i64) -> TillResult<i64> {
        Self::validate(product)?;
        if product.current_stock < 0 {
            return Err(ValidationError::OutOfRange {
                field: "current_stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let id = ProductRepository::insert(&mut tx, product).await?;

        if product.current_stock > 0 {
            let movement = StockMovement {
                id: None,
                product_id: id,
                kind: MovementKind::Addition,
                quantity_delta: product.current_stock,
                previous_stock: 0,
                resulting_stock: product.current_stock,
                user_id,
                reason: "Initial stock".to_string(),
                sale_id: None,
                recorded_at: Utc::now(),
            };
            StockRepository::insert_movement(&mut tx, &movement).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %id,
            name = %product.name,
            stock = %product.current_stock,
            user_id = %user_id,
            "Product created"
        );
        Ok(id)
    }

    /// Updates a product's catalog fields (never its stock).
    pub async fn update_product(&self, product: &Product, user_id: i64) -> TillResult<()> {
        Self::validate(product)?;
        self.db.products().update(product).await?;

        info!(product_id = ?product.id, user_id = %user_id, "Product updated");
        Ok(())
    }

    /// Archives a product: hidden from sale and search, history intact.
    pub async fn archive_product(&self, id: i64, user_id: i64) -> TillResult<()> {
        self.db.products().set_archived(id, true).await?;
        info!(product_id = %id, user_id = %user_id, "Product archived");
        Ok(())
    }

    /// Restores an archived product to active trading.
    pub async fn restore_product(&self, id: i64, user_id: i64) -> TillResult<()> {
        self.db.products().set_archived(id, false).await?;
        info!(product_id = %id, user_id = %user_id, "Product restored");
        Ok(())
    }

    /// True when the product can be hard-deleted without force (no sale
    /// lines, no movements).
    pub async fn can_delete_product(&self, id: i64) -> TillResult<bool> {
        Ok(!self.db.products().has_history(id).await?)
    }

    /// Hard-deletes a product row.
    ///
    /// Without `force`, products with any sale or movement history are
    /// refused with `ProductHasHistory`; archive those instead. With
    /// `force`, remaining stock is written off with a Deletion movement
    /// and the row is removed; historical rows keep their product_id.
    pub async fn delete_product(&self, id: i64, user_id: i64, force: bool) -> TillResult<()> {
        let product = self
            .db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| TillError::Core(CoreError::ProductNotFound(id.to_string())))?;

        if !force && self.db.products().has_history(id).await? {
            return Err(CoreError::ProductHasHistory(id).into());
        }

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        if product.current_stock > 0 {
            let movement = StockMovement {
                id: None,
                product_id: id,
                kind: MovementKind::Deletion,
                quantity_delta: -product.current_stock,
                previous_stock: product.current_stock,
                resulting_stock: 0,
                user_id,
                reason: "Product deleted".to_string(),
                sale_id: None,
                recorded_at: Utc::now(),
            };
            StockRepository::set_stock(&mut tx, id, 0).await?;
            StockRepository::insert_movement(&mut tx, &movement).await?;
        }

        ProductRepository::delete(&mut tx, id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(product_id = %id, user_id = %user_id, force = %force, "Product deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Gets a product by id.
    pub async fn get_by_id(&self, id: i64) -> TillResult<Option<Product>> {
        Ok(self.db.products().get_by_id(id).await?)
    }

    /// Gets a product by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> TillResult<Option<Product>> {
        Ok(self.db.products().get_by_barcode(barcode).await?)
    }

    /// Searches active products by name or barcode substring.
    pub async fn search(&self, term: &str) -> TillResult<Vec<Product>> {
        Ok(self.db.products().search(term).await?)
    }

    /// Lists active products in a category.
    pub async fn by_category(&self, category: Category) -> TillResult<Vec<Product>> {
        Ok(self.db.products().by_category(category).await?)
    }

    /// Lists all products, optionally including archived ones.
    pub async fn all_products(&self, include_archived: bool) -> TillResult<Vec<Product>> {
        Ok(self.db.products().all(include_archived).await?)
    }

    /// Lists archived products.
    pub async fn archived_products(&self) -> TillResult<Vec<Product>> {
        Ok(self.db.products().archived().await?)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn validate(product: &Product) -> TillResult<()> {
        validate_product_name(&product.name)?;
        validate_barcode(product.barcode.as_deref())?;
        validate_price_cents(product.cost_price_cents)?;
        validate_price_cents(product.sell_price_cents)?;
        validate_vat_rate_bps(product.vat_rate_bps)?;
        validate_min_stock(product.min_stock)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::StockLedger;
    use spaza_db::DbConfig;

    async fn test_catalog() -> (Database, Catalog) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = Catalog::new(db.clone(), ShopConfig::default());
        (db, catalog)
    }

    fn stocked_product(catalog: &Catalog, name: &str, stock: i64) -> Product {
        let mut product = catalog.new_product(name, Category::Food);
        product.cost_price_cents = 1000;
        product.sell_price_cents = 1500;
        product.current_stock = stock;
        product.min_stock = 2;
        product
    }

    #[tokio::test]
    async fn test_create_logs_initial_stock_movement() {
        let (db, catalog) = test_catalog().await;

        let id = catalog
            .create_product(&stocked_product(&catalog, "Brown Bread 700g", 18), 1)
            .await
            .unwrap();

        let loaded = catalog.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.current_stock, 18);
        assert_eq!(loaded.vat_rate_bps, 1500); // shop default
        assert!(loaded.vat_inclusive);

        let movements = db.stock().movements_for(id, 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Addition);
        assert_eq!(movements[0].quantity_delta, 18);
        assert_eq!(movements[0].previous_stock, 0);
        assert_eq!(movements[0].reason, "Initial stock");
    }

    #[tokio::test]
    async fn test_create_zero_stock_logs_nothing() {
        let (db, catalog) = test_catalog().await;
        let id = catalog
            .create_product(&stocked_product(&catalog, "Matches 10-pack", 0), 1)
            .await
            .unwrap();
        assert!(db.stock().movements_for(id, 10).await.unwrap().is_empty());
        assert!(catalog.can_delete_product(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (_db, catalog) = test_catalog().await;

        let unnamed = stocked_product(&catalog, "", 0);
        assert!(catalog.create_product(&unnamed, 1).await.is_err());

        let mut bad_barcode = stocked_product(&catalog, "Ok Name", 0);
        bad_barcode.barcode = Some("not-a-barcode".to_string());
        assert!(catalog.create_product(&bad_barcode, 1).await.is_err());

        let mut negative_price = stocked_product(&catalog, "Ok Name", 0);
        negative_price.sell_price_cents = -5;
        assert!(catalog.create_product(&negative_price, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_archive_and_restore() {
        let (_db, catalog) = test_catalog().await;
        let id = catalog
            .create_product(&stocked_product(&catalog, "Green Bar Soap", 14), 1)
            .await
            .unwrap();

        catalog.archive_product(id, 1).await.unwrap();
        assert!(catalog.search("Soap").await.unwrap().is_empty());
        assert_eq!(catalog.archived_products().await.unwrap().len(), 1);

        catalog.restore_product(id, 1).await.unwrap();
        assert_eq!(catalog.search("Soap").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_refused_with_history() {
        let (_db, catalog) = test_catalog().await;
        // Initial stock creates a movement, which counts as history
        let id = catalog
            .create_product(&stocked_product(&catalog, "Washing Powder 1kg", 8), 1)
            .await
            .unwrap();

        assert!(!catalog.can_delete_product(id).await.unwrap());
        let err = catalog.delete_product(id, 1, false).await.unwrap_err();
        assert!(matches!(
            err,
            TillError::Core(CoreError::ProductHasHistory(_))
        ));
        assert!(catalog.get_by_id(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_without_history() {
        let (_db, catalog) = test_catalog().await;
        let id = catalog
            .create_product(&stocked_product(&catalog, "Mistake Entry", 0), 1)
            .await
            .unwrap();

        catalog.delete_product(id, 1, false).await.unwrap();
        assert!(catalog.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_force_delete_writes_off_stock_and_keeps_audit() {
        let (db, catalog) = test_catalog().await;
        let id = catalog
            .create_product(&stocked_product(&catalog, "Discontinued Line", 6), 1)
            .await
            .unwrap();

        // Some trading history on top of the initial stock
        let ledger = StockLedger::new(db.clone());
        ledger
            .adjust(id, -2, MovementKind::Adjustment, 1, "damaged")
            .await
            .unwrap();

        catalog.delete_product(id, 1, true).await.unwrap();
        assert!(catalog.get_by_id(id).await.unwrap().is_none());

        // The audit trail survives the product, ending in a Deletion
        // movement that wrote off the remaining 4 units
        let movements = db.stock().movements_for(id, 10).await.unwrap();
        assert_eq!(movements.len(), 3);
        let write_off = &movements[0];
        assert_eq!(write_off.kind, MovementKind::Deletion);
        assert_eq!(write_off.quantity_delta, -4);
        assert_eq!(write_off.resulting_stock, 0);
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let (_db, catalog) = test_catalog().await;
        let id = catalog
            .create_product(&stocked_product(&catalog, "Still Water 500ml", 36), 1)
            .await
            .unwrap();

        let mut product = catalog.get_by_id(id).await.unwrap().unwrap();
        product.sell_price_cents = 999;
        product.current_stock = 0; // ignored by the update path
        catalog.update_product(&product, 1).await.unwrap();

        let reloaded = catalog.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.sell_price_cents, 999);
        assert_eq!(reloaded.current_stock, 36);
    }
}
