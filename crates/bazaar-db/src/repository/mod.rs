//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Caller ──► db.products() ──► ProductRepository { pool } ──► SQL        │
//! │                                                                         │
//! │  • Each repository owns a pool clone (cheap, Arc inside)               │
//! │  • Methods return bazaar-core types, never raw rows                    │
//! │  • Errors are DbError                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - Auth accounts, sessions, recovery tokens
//! - [`UserRepository`](user::UserRepository) - User profile rows
//! - [`VendorRepository`](vendor::VendorRepository) - Vendor rows and approval
//! - [`ProductRepository`](product::ProductRepository) - Catalog
//! - [`OrderRepository`](order::OrderRepository) - Checkout and order status
//! - [`SettingsRepository`](settings::SettingsRepository) - Store settings

pub mod account;
pub mod order;
pub mod product;
pub mod settings;
pub mod user;
pub mod vendor;

#[cfg(test)]
pub(crate) mod test_support {
    use bazaar_core::{NewProduct, Product, UserProfile, VendorApplication, VendorProfile};
    use chrono::Utc;
    use uuid::Uuid;

    use crate::repository::account::AuthAccount;
    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Account plus profile row.
    pub async fn seed_user(db: &Database, email: &str) -> UserProfile {
        let now = Utc::now();
        let account = AuthAccount {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: Some("not-a-real-hash".to_string()),
            provider: "email".to_string(),
            created_at: now,
            updated_at: now,
        };
        db.accounts().insert(&account).await.unwrap();

        let user = UserProfile {
            id: account.id,
            email: email.to_string(),
            full_name: "Test Shopper".to_string(),
            phone: None,
            address: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        db.users().insert(&user).await.unwrap()
    }

    pub async fn seed_vendor(db: &Database, email: &str, approved: bool) -> VendorProfile {
        let user = seed_user(db, email).await;
        let app = VendorApplication {
            business_name: format!("{} Goods", email),
            business_email: email.to_string(),
            ..Default::default()
        };
        let vendor = db.vendors().insert(&user.id, &app).await.unwrap();
        if approved {
            db.vendors().set_approved(&vendor.id, true).await.unwrap();
            return db.vendors().get_by_id(&vendor.id).await.unwrap().unwrap();
        }
        vendor
    }

    pub async fn seed_product(
        db: &Database,
        vendor_id: &str,
        name: &str,
        price_cents: i64,
        stock: i64,
    ) -> Product {
        let product = NewProduct {
            name: name.to_string(),
            price_cents,
            stock,
            category: Some("crafts".to_string()),
            ..Default::default()
        };
        db.products().insert(vendor_id, &product).await.unwrap()
    }
}
