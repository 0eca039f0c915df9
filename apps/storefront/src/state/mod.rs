//! # State Module
//!
//! Application state for the console storefront.
//!
//! ## Why Multiple State Types?
//! Each command takes only the state it needs, so its signature says what it
//! touches:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                         AppState                                │   │
//! │  │   owned by the Shell, lent to commands field by field           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │      ┌───────────────┬───────┴────────┬─────────────────┐              │
//! │      ▼               ▼                ▼                 ▼               │
//! │  ┌─────────┐  ┌──────────────┐  ┌───────────┐  ┌──────────────┐        │
//! │  │ DbState │  │ SessionState │  │ CartState │  │ ConfigState  │        │
//! │  │ Database│  │ SessionStore │  │ Mutex<    │  │ store name   │        │
//! │  │ (pool)  │  │ <LocalBackend│  │   Cart>   │  │ pricing rules│        │
//! │  └─────────┘  └──────────────┘  └───────────┘  └──────────────┘        │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: pool is thread-safe                                        │
//! │  • SessionState: store serializes all transitions internally           │
//! │  • CartState: Mutex for exclusive access                               │
//! │  • ConfigState: read-only after initialization                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod db;
mod session;

pub use cart::CartState;
pub use config::ConfigState;
pub use db::DbState;
pub use session::{ConsoleNotifier, SessionState};

use std::sync::Arc;

use bazaar_db::Database;
use bazaar_session::{
    LocalBackend, SessionNotifier, SessionStorage, SessionStore, StorefrontConfig,
};

/// Everything the shell hands out to commands.
pub struct AppState {
    pub db: DbState,
    pub session: SessionState,
    pub cart: CartState,
    pub config: ConfigState,
}

impl AppState {
    /// Builds the state objects. Must be called inside a tokio runtime: the
    /// session store spawns its tasks here.
    pub fn new(
        db: Database,
        config: &StorefrontConfig,
        storage: Arc<dyn SessionStorage>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        let backend = Arc::new(LocalBackend::new(db.clone(), &config.auth));
        let store = SessionStore::new(backend, storage, notifier)
            .with_min_password_length(config.auth.min_password_length);

        AppState {
            db: DbState::new(db),
            session: SessionState::new(store),
            cart: CartState::new(),
            config: ConfigState::from_config(config),
        }
    }
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bazaar_core::{NewProduct, Product, UserProfile, VendorProfile, VendorApplication};
    use bazaar_db::DbConfig;
    use bazaar_session::{MemorySessionStorage, NoOpNotifier};

    pub const ADMIN_PASSWORD: &str = "Dara2002";
    pub const PASSWORD: &str = "secret1";

    /// Fresh in-memory storefront with the admin password set.
    pub async fn test_state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set_admin_password(ADMIN_PASSWORD).await.unwrap();

        AppState::new(
            db,
            &StorefrontConfig::default(),
            Arc::new(MemorySessionStorage::new()),
            Arc::new(NoOpNotifier),
        )
    }

    /// Signs up and signs in a shopper.
    pub async fn signed_in(state: &AppState, email: &str) -> UserProfile {
        let store = state.session.inner();
        store.sign_up(email, PASSWORD, "Test Shopper").await.unwrap();
        store.sign_in(email, PASSWORD).await.unwrap();
        store.user().unwrap()
    }

    /// Signs in a new user who then applies to become a vendor.
    pub async fn signed_in_vendor(state: &AppState, email: &str, approved: bool) -> VendorProfile {
        signed_in(state, email).await;
        let vendor = state
            .session
            .inner()
            .become_vendor(VendorApplication {
                business_name: format!("Shop of {}", email),
                business_email: email.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        if approved {
            state
                .db
                .inner()
                .vendors()
                .set_approved(&vendor.id, true)
                .await
                .unwrap();
            state.session.inner().refresh_profile().await.unwrap();
        }

        state.session.inner().vendor().unwrap()
    }

    /// Lists a product for an approved vendor straight through the database.
    pub async fn listed_product(
        state: &AppState,
        vendor: &VendorProfile,
        name: &str,
        price_cents: i64,
        stock: i64,
    ) -> Product {
        state
            .db
            .inner()
            .products()
            .insert(
                &vendor.id,
                &NewProduct {
                    name: name.to_string(),
                    price_cents,
                    stock,
                    category: Some("textiles".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }
}
