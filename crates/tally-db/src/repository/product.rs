//! # Product Repository
//!
//! Catalog reads and writes, plus the stock statements used inside the
//! checkout and refund transactions.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, compare in Rust, then write                           │
//! │     SELECT stock_quantity ...   → 1                                     │
//! │     (another register sells the last unit here)                         │
//! │     UPDATE ... SET stock_quantity = 0                                   │
//! │                                                                         │
//! │  ✅ CORRECT: the check IS the write                                    │
//! │     UPDATE products SET stock_quantity = stock_quantity - ?2            │
//! │     WHERE id = ?1 AND track_stock = 1 AND stock_quantity >= ?2          │
//! │                                                                         │
//! │     rows_affected = 0  →  InsufficientStock, transaction rolled back    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_product;
use tally_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, sku, barcode, name, description,
    price_cents, cost_cents, tax_rate_bps,
    track_stock, stock_quantity, min_stock_level, max_stock_level,
    is_active, created_at, updated_at
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        debug!(limit = %limit, "Listing active products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut *conn, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// Untracked products are stored with zero stock.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        let product = product.clone().normalized();
        validate_product(&product)?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, barcode, name, description,
                price_cents, cost_cents, tax_rate_bps,
                track_stock, stock_quantity, min_stock_level, max_stock_level,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.tax_rate_bps)
        .bind(product.track_stock)
        .bind(product.min_stock_level)
        .bind(product.max_stock_level)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        Ok(product)
    }

    /// Updates catalog fields of an existing product.
    ///
    /// Price and tax changes never reach existing order lines, which carry
    /// their own snapshot. `stock_quantity` on the argument is ignored: stock
    /// only moves through `adjust_stock` and the sale/refund paths, and is
    /// zeroed when tracking is switched off.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let product = product.clone().normalized();
        validate_product(&product)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                barcode = ?3,
                name = ?4,
                description = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                tax_rate_bps = ?8,
                track_stock = ?9,
                stock_quantity = CASE WHEN ?9 = 0 THEN 0 ELSE stock_quantity END,
                min_stock_level = ?10,
                max_stock_level = ?11,
                is_active = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.tax_rate_bps)
        .bind(product.track_stock)
        .bind(product.min_stock_level)
        .bind(product.max_stock_level)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Applies a stock delta (positive receives, negative shrinkage).
    ///
    /// ## Returns
    /// * `Ok(Some(level))` - New stock level
    /// * `Ok(None)` - Product does not track stock; nothing changed
    /// * `Err(DbError::CheckViolation)` - Delta would make stock negative
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Option<i64>> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let level: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND track_stock = 1
            RETURNING stock_quantity
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if level.is_none() && self.get_by_id(id).await?.is_none() {
            return Err(DbError::not_found("Product", id));
        }

        Ok(level)
    }

    /// Active tracked products at or below their reorder threshold.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_active = 1 AND track_stock = 1 AND stock_quantity <= min_stock_level
            ORDER BY stock_quantity, name
            LIMIT ?1
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Low-stock products");
        Ok(products)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Order lines keep their snapshot, so history is unaffected.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-Scoped Statements
// =============================================================================

/// Reads a product on an existing connection or transaction.
pub async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

/// Decrements a tracked product's stock only if enough is on hand.
///
/// Returns false when the product is untracked, missing, or short. Callers
/// only pass tracked products.
pub async fn decrement_stock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND track_stock = 1 AND stock_quantity >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts units back on a tracked product. Untracked products are left alone.
pub async fn restock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2, updated_at = ?3
        WHERE id = ?1 AND track_stock = 1
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::testing::new_product;

    async fn setup() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        (db, repo)
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let (_db, repo) = setup().await;
        let product = repo.insert(&new_product("COKE-330", 150, 1000, Some(24))).await.unwrap();

        let by_id = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "COKE-330");
        assert_eq!(by_id.tax_rate_bps, 1000);
        assert_eq!(by_id.stock_quantity, 24);

        let by_sku = repo.get_by_sku("COKE-330").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);
        assert!(repo.get_by_sku("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let (_db, repo) = setup().await;
        repo.insert(&new_product("DUP-1", 100, 0, Some(1))).await.unwrap();

        let err = repo.insert(&new_product("DUP-1", 200, 0, Some(1))).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "DUP-1"),
            other => panic!("expected UniqueViolation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected_before_write() {
        let (_db, repo) = setup().await;
        let mut product = new_product("BAD SKU!", 100, 0, Some(1));

        let err = repo.insert(&product).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidRecord(_)));

        product.sku = "GOOD-1".to_string();
        product.price_cents = -5;
        assert!(matches!(repo.insert(&product).await, Err(DbError::InvalidRecord(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_untracked_product_stored_with_zero_stock() {
        let (_db, repo) = setup().await;
        let mut product = new_product("SERVICE-1", 500, 0, None);
        product.stock_quantity = 40;

        let stored = repo.insert(&product).await.unwrap();
        assert_eq!(stored.stock_quantity, 0);
        assert_eq!(repo.adjust_stock(&stored.id, 5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let (_db, repo) = setup().await;
        let product = repo.insert(&new_product("MILK-1L", 199, 0, Some(3))).await.unwrap();

        assert_eq!(repo.adjust_stock(&product.id, 7).await.unwrap(), Some(10));
        assert_eq!(repo.adjust_stock(&product.id, -4).await.unwrap(), Some(6));

        let err = repo.adjust_stock(&product.id, -100).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        let err = repo.adjust_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let (db, repo) = setup().await;
        let product = repo.insert(&new_product("LAST-ONE", 100, 0, Some(2))).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(decrement_stock(&mut *conn, &product.id, 2).await.unwrap());
        assert!(!decrement_stock(&mut *conn, &product.id, 1).await.unwrap());
        restock(&mut *conn, &product.id, 1).await.unwrap();
        drop(conn);

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 1);
    }

    #[tokio::test]
    async fn test_low_stock_and_soft_delete() {
        let (_db, repo) = setup().await;
        let low = repo.insert(&new_product("LOW-1", 100, 0, Some(1))).await.unwrap();
        repo.insert(&new_product("PLENTY-1", 100, 0, Some(50))).await.unwrap();
        repo.insert(&new_product("UNTRACKED-1", 100, 0, None)).await.unwrap();

        let report = repo.low_stock(10).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].id, low.id);
        assert_eq!(repo.count().await.unwrap(), 3);

        repo.soft_delete(&low.id).await.unwrap();
        assert!(repo.low_stock(10).await.unwrap().is_empty());
        assert_eq!(repo.list_active(10).await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_product() {
        let (_db, repo) = setup().await;
        let mut product = repo.insert(&new_product("TEA-1", 300, 0, Some(5))).await.unwrap();

        product.price_cents = 350;
        product.name = "Green Tea".to_string();
        repo.update(&product).await.unwrap();

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.price_cents, 350);
        assert_eq!(stored.name, "Green Tea");

        product.id = generate_product_id();
        assert!(matches!(repo.update(&product).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_from_stale_copy_keeps_sold_stock() {
        let (db, repo) = setup().await;
        let stale = repo.insert(&new_product("JAM-1", 400, 0, Some(5))).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(decrement_stock(&mut *conn, &stale.id, 3).await.unwrap());
        drop(conn);

        let mut renamed = stale.clone();
        renamed.name = "Strawberry Jam".to_string();
        repo.update(&renamed).await.unwrap();

        let stored = repo.get_by_id(&stale.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Strawberry Jam");
        assert_eq!(stored.stock_quantity, 2);

        renamed.stock_quantity = 99;
        repo.update(&renamed).await.unwrap();
        assert_eq!(repo.get_by_id(&stale.id).await.unwrap().unwrap().stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_update_that_stops_tracking_zeroes_stock() {
        let (_db, repo) = setup().await;
        let mut product = repo.insert(&new_product("GIFT-WRAP", 100, 0, Some(7))).await.unwrap();

        product.track_stock = false;
        repo.update(&product).await.unwrap();

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert!(!stored.track_stock);
        assert_eq!(stored.stock_quantity, 0);
    }
}
