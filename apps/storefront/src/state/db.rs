//! # Database State
//!
//! Wraps the `Database` handle for use in storefront commands.
//!
//! ## Thread Safety
//! `Database` holds a `SqlitePool`, which is thread-safe. Commands can run
//! queries concurrently without extra locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn search_products(db: &DbState, query: &str) -> ApiResult<Vec<Product>> {
//!     Ok(db.inner().products().search(query, 20).await?)
//! }
//! ```

use bazaar_db::Database;

/// Wrapper around `Database` for command state.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
