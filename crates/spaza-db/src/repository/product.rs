//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Rules
//! - `current_stock` is NEVER written here except at insert time; every
//!   later stock change goes through the stock ledger so it is paired with
//!   a movement record.
//! - `archived` is only toggled through `set_archived` (explicit
//!   archive/restore transitions), never as a side effect of `update`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use spaza_core::{Category, Product};

/// Columns selected for every product query, in struct field order.
const PRODUCT_COLUMNS: &str = "id, name, barcode, category, cost_price_cents, sell_price_cents, \
     current_stock, min_stock, vat_rate_bps, vat_inclusive, archived, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("bread").await?;
/// let product = repo.get_by_barcode("6001234567890").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a product by its ID (archived or not).
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its barcode (archived or not).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE barcode = ?1",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Searches active products by name or barcode substring.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Product>> {
        let term = term.trim();
        debug!(term = %term, "Searching products");

        let pattern = format!("%{}%", term);
        let sql = format!(
            "SELECT {} FROM products \
             WHERE archived = 0 AND (name LIKE ?1 OR barcode LIKE ?1) \
             ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products in a category, sorted by name.
    pub async fn by_category(&self, category: Category) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE archived = 0 AND category = ?1 ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists all products, optionally including archived ones.
    pub async fn all(&self, include_archived: bool) -> DbResult<Vec<Product>> {
        let sql = if include_archived {
            format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM products WHERE archived = 0 ORDER BY name",
                PRODUCT_COLUMNS
            )
        };
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Active products at or below their reorder threshold.
    ///
    /// Ordered ascending by current stock, most urgent first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products \
             WHERE archived = 0 AND current_stock <= min_stock \
             ORDER BY current_stock",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists archived products, sorted by name.
    pub async fn archived(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE archived = 1 ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE archived = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// True when the product appears on any sale line or stock movement.
    ///
    /// Products with history may be archived but never hard-deleted.
    pub async fn has_history(&self, id: i64) -> DbResult<bool> {
        let has: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sale_items WHERE product_id = ?1) \
             OR EXISTS(SELECT 1 FROM stock_movements WHERE product_id = ?1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(has)
    }

    // -------------------------------------------------------------------------
    // Standalone writes
    // -------------------------------------------------------------------------

    /// Updates an existing product's catalog fields.
    ///
    /// Deliberately does NOT write `current_stock` (stock ledger territory)
    /// or `archived` (explicit transition via `set_archived`).
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let id = product
            .id
            .ok_or_else(|| DbError::not_found("Product", "unsaved"))?;

        debug!(id = %id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET \
                name = ?2, \
                barcode = ?3, \
                category = ?4, \
                cost_price_cents = ?5, \
                sell_price_cents = ?6, \
                min_stock = ?7, \
                vat_rate_bps = ?8, \
                vat_inclusive = ?9, \
                updated_at = ?10 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.category)
        .bind(product.cost_price_cents)
        .bind(product.sell_price_cents)
        .bind(product.min_stock)
        .bind(product.vat_rate_bps)
        .bind(product.vat_inclusive)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Sets the archived flag (soft delete / restore).
    pub async fn set_archived(&self, id: i64, archived: bool) -> DbResult<()> {
        debug!(id = %id, archived = %archived, "Setting product archived flag");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET archived = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(archived)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped writes (composed by the service layer)
    // -------------------------------------------------------------------------

    /// Inserts a new product and returns its assigned id.
    ///
    /// Takes a connection so the catalog service can pair the insert with
    /// an initial-stock movement in one transaction.
    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<i64> {
        debug!(name = %product.name, "Inserting product");

        let result = sqlx::query(
            "INSERT INTO products ( \
                name, barcode, category, cost_price_cents, sell_price_cents, \
                current_stock, min_stock, vat_rate_bps, vat_inclusive, \
                archived, created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.category)
        .bind(product.cost_price_cents)
        .bind(product.sell_price_cents)
        .bind(product.current_stock)
        .bind(product.min_stock)
        .bind(product.vat_rate_bps)
        .bind(product.vat_inclusive)
        .bind(product.archived)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Hard-deletes a product row.
    ///
    /// Only reachable through the catalog service, which has already
    /// verified the product has no history.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn test_product(name: &str, barcode: Option<&str>) -> Product {
        let now = Utc::now();
        Product {
            id: None,
            name: name.to_string(),
            barcode: barcode.map(|b| b.to_string()),
            category: Category::Food,
            cost_price_cents: 1000,
            sell_price_cents: 1500,
            current_stock: 10,
            min_stock: 3,
            vat_rate_bps: 1500,
            vat_inclusive: true,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert(db: &Database, product: &Product) -> i64 {
        let mut conn = db.pool().acquire().await.unwrap();
        ProductRepository::insert(&mut conn, product).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = insert(&db, &test_product("White Bread 700g", Some("6001234567890"))).await;

        let loaded = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.name, "White Bread 700g");
        assert_eq!(loaded.category, Category::Food);
        assert_eq!(loaded.current_stock, 10);
        assert_eq!(loaded.vat_rate_bps, 1500);
        assert!(loaded.vat_inclusive);
        assert!(!loaded.archived);
    }

    #[tokio::test]
    async fn test_get_by_barcode() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &test_product("Coke 330ml", Some("5449000000996"))).await;

        let found = db
            .products()
            .get_by_barcode("5449000000996")
            .await
            .unwrap();
        assert!(found.is_some());

        let missing = db.products().get_by_barcode("0000000000000").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &test_product("A", Some("6001234567890"))).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let err = ProductRepository::insert(&mut conn, &test_product("B", Some("6001234567890")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_excludes_archived() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let keep = insert(&db, &test_product("Sugar 1kg", None)).await;
        let gone = insert(&db, &test_product("Sugar 2kg", None)).await;
        db.products().set_archived(gone, true).await.unwrap();

        let hits = db.products().search("Sugar").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, Some(keep));

        // Archived products still resolve by id for history views
        assert!(db.products().get_by_id(gone).await.unwrap().is_some());
        assert_eq!(db.products().archived().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_stock_ordered_most_urgent_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut nearly_out = test_product("Nearly Out", None);
        nearly_out.current_stock = 1;
        nearly_out.min_stock = 5;
        insert(&db, &nearly_out).await;

        let mut at_threshold = test_product("At Threshold", None);
        at_threshold.current_stock = 5;
        at_threshold.min_stock = 5;
        insert(&db, &at_threshold).await;

        let mut healthy = test_product("Healthy", None);
        healthy.current_stock = 50;
        healthy.min_stock = 5;
        insert(&db, &healthy).await;

        let low = db.products().low_stock().await.unwrap();
        assert_eq!(low.len(), 2);
        assert_eq!(low[0].name, "Nearly Out");
        assert_eq!(low[1].name, "At Threshold");
    }

    #[tokio::test]
    async fn test_update_does_not_touch_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = insert(&db, &test_product("Milk 1L", None)).await;

        let mut product = db.products().get_by_id(id).await.unwrap().unwrap();
        product.name = "Milk 1L Full Cream".to_string();
        product.sell_price_cents = 2199;
        product.current_stock = 999; // must be ignored by update()
        db.products().update(&product).await.unwrap();

        let reloaded = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Milk 1L Full Cream");
        assert_eq!(reloaded.sell_price_cents, 2199);
        assert_eq!(reloaded.current_stock, 10);
    }

    #[tokio::test]
    async fn test_has_history_false_for_fresh_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = insert(&db, &test_product("Fresh", None)).await;
        assert!(!db.products().has_history(id).await.unwrap());
    }
}
