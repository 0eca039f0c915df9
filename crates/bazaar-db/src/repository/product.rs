//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Visibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Who Sees Which Products                                │
//! │                                                                         │
//! │  Shopper (search / get_listed)                                         │
//! │    products.is_active = 1  AND  vendors.is_approved = 1                │
//! │                                                                         │
//! │  Vendor dashboard (list_by_vendor)                                     │
//! │    every row with products.vendor_id = my vendor id, active or not     │
//! │                                                                         │
//! │  Writes (set_stock / soft_delete)                                      │
//! │    WHERE id = ? AND vendor_id = ?  ── a vendor only touches its own    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::{NewProduct, Product};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.vendor_id, p.name, p.description, p.price_cents, p.stock,
    p.image_url, p.category, p.is_active, p.created_at, p.updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let results = db.products().search("scarf", 20).await?;
/// let product = db.products().get_listed("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches listed products by name or category.
    ///
    /// ## Arguments
    /// * `query` - Substring to match (case-insensitive for ASCII); empty lists all
    /// * `limit` - Maximum results to return
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {}
            FROM products p
            INNER JOIN vendors v ON v.id = p.vendor_id
            WHERE p.is_active = 1
              AND v.is_approved = 1
              AND (?1 = ''
                   OR p.name LIKE ?2 ESCAPE '\'
                   OR p.category LIKE ?2 ESCAPE '\')
            ORDER BY p.name
            LIMIT ?3
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(query)
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Gets a product by id regardless of visibility.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products p WHERE p.id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product only if a shopper may see it.
    pub async fn get_listed(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {}
            FROM products p
            INNER JOIN vendors v ON v.id = p.vendor_id
            WHERE p.id = ?1 AND p.is_active = 1 AND v.is_approved = 1
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// All of a vendor's products, including deactivated ones.
    pub async fn list_by_vendor(&self, vendor_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products p WHERE p.vendor_id = ?1 ORDER BY p.created_at DESC",
            PRODUCT_COLUMNS
        ))
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists a new product for `vendor_id`.
    pub async fn insert(&self, vendor_id: &str, new: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            vendor_id: vendor_id.to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            price_cents: new.price_cents,
            stock: new.stock,
            image_url: new.image_url.clone(),
            category: new.category.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, vendor_id = %vendor_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, vendor_id, name, description, price_cents, stock,
                image_url, category, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.vendor_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Sets the stock level of one of `vendor_id`'s products.
    pub async fn set_stock(&self, id: &str, vendor_id: &str, stock: i64) -> DbResult<()> {
        debug!(id = %id, stock, "Setting stock");

        let result = sqlx::query(
            r#"
            UPDATE products SET stock = ?3, updated_at = ?4
            WHERE id = ?1 AND vendor_id = ?2
            "#,
        )
        .bind(id)
        .bind(vendor_id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes one of `vendor_id`'s products.
    ///
    /// ## Why Soft Delete?
    /// Order lines still reference the product row.
    pub async fn soft_delete(&self, id: &str, vendor_id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?3
            WHERE id = ?1 AND vendor_id = ?2
            "#,
        )
        .bind(id)
        .bind(vendor_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_product, seed_vendor, test_db};

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_search_only_lists_approved_active() {
        let db = test_db().await;
        let approved = seed_vendor(&db, "a@example.com", true).await;
        let pending = seed_vendor(&db, "p@example.com", false).await;

        let scarf = seed_product(&db, &approved.id, "Adire Scarf", 4500, 3).await;
        let hidden = seed_product(&db, &approved.id, "Adire Wrap", 6000, 3).await;
        seed_product(&db, &pending.id, "Adire Bag", 9000, 3).await;

        db.products()
            .soft_delete(&hidden.id, &approved.id)
            .await
            .unwrap();

        let results = db.products().search("adire", 20).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, scarf.id);

        assert!(db.products().get_listed(&hidden.id).await.unwrap().is_none());
        assert!(db.products().get_by_id(&hidden.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_by_category_and_empty_query() {
        let db = test_db().await;
        let vendor = seed_vendor(&db, "a@example.com", true).await;
        seed_product(&db, &vendor.id, "Beaded Necklace", 2500, 1).await;
        seed_product(&db, &vendor.id, "Clay Pot", 3000, 1).await;

        assert_eq!(db.products().search("crafts", 20).await.unwrap().len(), 2);
        assert_eq!(db.products().search("", 20).await.unwrap().len(), 2);
        assert_eq!(db.products().search("", 1).await.unwrap().len(), 1);
        assert!(db.products().search("%", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vendor_can_only_touch_own_products() {
        let db = test_db().await;
        let owner = seed_vendor(&db, "a@example.com", true).await;
        let other = seed_vendor(&db, "b@example.com", true).await;
        let product = seed_product(&db, &owner.id, "Clay Pot", 3000, 1).await;

        assert!(matches!(
            db.products().set_stock(&product.id, &other.id, 50).await,
            Err(DbError::NotFound { .. })
        ));

        db.products()
            .set_stock(&product.id, &owner.id, 50)
            .await
            .unwrap();
        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 50);

        assert_eq!(db.products().list_by_vendor(&owner.id).await.unwrap().len(), 1);
        assert!(db.products().list_by_vendor(&other.id).await.unwrap().is_empty());
    }
}
