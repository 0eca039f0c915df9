//! # Settings Repository
//!
//! Key/value store settings.
//!
//! The `admin_password` key holds the admin gate's comparison value in
//! plaintext, readable by any client with database access. It is kept that
//! way to match the hosted database the storefront was built against.

use bazaar_core::ADMIN_PASSWORD_KEY;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the `settings` table.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Inserts or replaces a setting.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The stored admin password, if one has been set.
    pub async fn admin_password(&self) -> DbResult<Option<String>> {
        self.get(ADMIN_PASSWORD_KEY).await
    }

    pub async fn set_admin_password(&self, password: &str) -> DbResult<()> {
        self.set(ADMIN_PASSWORD_KEY, password).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_set_overwrites() {
        let db = test_db().await;
        assert!(db.settings().get("greeting").await.unwrap().is_none());

        db.settings().set("greeting", "hello").await.unwrap();
        db.settings().set("greeting", "welcome").await.unwrap();

        assert_eq!(
            db.settings().get("greeting").await.unwrap().as_deref(),
            Some("welcome")
        );
    }

    #[tokio::test]
    async fn test_admin_password_roundtrip() {
        let db = test_db().await;
        assert!(db.settings().admin_password().await.unwrap().is_none());

        db.settings().set_admin_password("Dara2002").await.unwrap();
        assert_eq!(
            db.settings().admin_password().await.unwrap().as_deref(),
            Some("Dara2002")
        );
    }
}
