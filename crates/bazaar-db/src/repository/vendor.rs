//! # Vendor Repository
//!
//! Vendor rows and their approval flag.
//!
//! ## Approval
//! ```text
//! insert() ──► is_approved = 0 ──(admin) set_approved(true)──► is_approved = 1
//! ```
//! There is no way to insert an approved vendor.

use bazaar_core::{VendorApplication, VendorProfile};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const VENDOR_COLUMNS: &str = r#"
    id, user_id, business_name, business_email, business_phone, business_address,
    description, logo_url, banner_url, is_approved, created_at, updated_at
"#;

/// Repository for vendor rows.
#[derive(Debug, Clone)]
pub struct VendorRepository {
    pool: SqlitePool,
}

impl VendorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VendorRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<VendorProfile>> {
        let vendor = sqlx::query_as::<_, VendorProfile>(&format!(
            "SELECT {} FROM vendors WHERE id = ?1",
            VENDOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vendor)
    }

    /// The vendor row owned by `user_id`, if the user has become a vendor.
    pub async fn get_by_user_id(&self, user_id: &str) -> DbResult<Option<VendorProfile>> {
        let vendor = sqlx::query_as::<_, VendorProfile>(&format!(
            "SELECT {} FROM vendors WHERE user_id = ?1",
            VENDOR_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vendor)
    }

    /// Inserts an unapproved vendor row for `user_id` and returns it.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - user already has a vendor row
    /// * `Err(DbError::ForeignKeyViolation)` - no such user
    pub async fn insert(
        &self,
        user_id: &str,
        app: &VendorApplication,
    ) -> DbResult<VendorProfile> {
        let now = Utc::now();
        let vendor = VendorProfile {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            business_name: app.business_name.trim().to_string(),
            business_email: app.business_email.trim().to_string(),
            business_phone: app.business_phone.clone(),
            business_address: app.business_address.clone(),
            description: app.description.clone(),
            logo_url: app.logo_url.clone(),
            banner_url: app.banner_url.clone(),
            is_approved: false,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %vendor.id, user_id = %user_id, "Inserting vendor");

        sqlx::query(
            r#"
            INSERT INTO vendors (
                id, user_id, business_name, business_email, business_phone,
                business_address, description, logo_url, banner_url,
                is_approved, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11)
            "#,
        )
        .bind(&vendor.id)
        .bind(&vendor.user_id)
        .bind(&vendor.business_name)
        .bind(&vendor.business_email)
        .bind(&vendor.business_phone)
        .bind(&vendor.business_address)
        .bind(&vendor.description)
        .bind(&vendor.logo_url)
        .bind(&vendor.banner_url)
        .bind(vendor.created_at)
        .bind(vendor.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: user_id.to_string(),
            },
            other => other,
        })?;

        Ok(vendor)
    }

    /// Sets the approval flag. Admin only; callers check.
    pub async fn set_approved(&self, id: &str, approved: bool) -> DbResult<()> {
        debug!(id = %id, approved, "Setting vendor approval");

        let result = sqlx::query(
            r#"
            UPDATE vendors SET is_approved = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(approved)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Vendor", id));
        }

        Ok(())
    }

    /// Vendors awaiting approval, oldest first.
    pub async fn list_pending(&self) -> DbResult<Vec<VendorProfile>> {
        let vendors = sqlx::query_as::<_, VendorProfile>(&format!(
            "SELECT {} FROM vendors WHERE is_approved = 0 ORDER BY created_at",
            VENDOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vendors)
    }

    pub async fn list_approved(&self) -> DbResult<Vec<VendorProfile>> {
        let vendors = sqlx::query_as::<_, VendorProfile>(&format!(
            "SELECT {} FROM vendors WHERE is_approved = 1 ORDER BY business_name",
            VENDOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vendors)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_user, seed_vendor, test_db};

    fn application() -> VendorApplication {
        VendorApplication {
            business_name: "  Kente House ".to_string(),
            business_email: "sales@kente.example".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_starts_unapproved() {
        let db = test_db().await;
        let user = seed_user(&db, "kofi@example.com").await;

        let vendor = db.vendors().insert(&user.id, &application()).await.unwrap();

        assert!(!vendor.is_approved);
        assert_eq!(vendor.business_name, "Kente House");

        let stored = db.vendors().get_by_user_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.id, vendor.id);
        assert!(!stored.is_approved);
    }

    #[tokio::test]
    async fn test_one_vendor_per_user() {
        let db = test_db().await;
        let user = seed_user(&db, "kofi@example.com").await;

        db.vendors().insert(&user.id, &application()).await.unwrap();
        let second = db.vendors().insert(&user.id, &application()).await;

        assert!(matches!(second, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_insert_for_unknown_user_fails() {
        let db = test_db().await;
        let result = db.vendors().insert("ghost", &application()).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_pending_and_approval() {
        let db = test_db().await;
        let pending = seed_vendor(&db, "a@example.com", false).await;
        seed_vendor(&db, "b@example.com", true).await;

        let listed = db.vendors().list_pending().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);

        db.vendors().set_approved(&pending.id, true).await.unwrap();
        assert!(db.vendors().list_pending().await.unwrap().is_empty());
        assert_eq!(db.vendors().list_approved().await.unwrap().len(), 2);

        assert!(matches!(
            db.vendors().set_approved("ghost", true).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
