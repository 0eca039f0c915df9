//! # User Repository
//!
//! Profile rows in `users`. The id is always the auth account id.

use bazaar_core::{ProfileUpdate, UserProfile};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str =
    "id, email, full_name, phone, address, avatar_url, created_at, updated_at";

/// Repository for user profile rows.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a profile by user id.
    ///
    /// ## Returns
    /// * `Ok(Some(UserProfile))` - Row found
    /// * `Ok(None)` - No profile row for this user
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Inserts a profile row and returns it as stored.
    pub async fn insert(&self, user: &UserProfile) -> DbResult<UserProfile> {
        debug!(id = %user.id, "Inserting user profile");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, full_name, phone, address, avatar_url, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user.clone())
    }

    /// Writes only the fields set in `update`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no row with this id
    pub async fn update_partial(&self, id: &str, update: &ProfileUpdate) -> DbResult<()> {
        debug!(id = %id, "Updating user profile");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                full_name = COALESCE(?2, full_name),
                phone = COALESCE(?3, phone),
                address = COALESCE(?4, address),
                avatar_url = COALESCE(?5, avatar_url),
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.avatar_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
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
    use crate::repository::test_support::{seed_user, test_db};

    #[tokio::test]
    async fn test_get_by_id_and_email() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;

        let by_id = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ada@example.com");

        let by_email = db.users().get_by_email("ADA@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        assert!(db.users().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_partial_leaves_other_fields() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;

        let update = ProfileUpdate {
            phone: Some("0803".to_string()),
            ..Default::default()
        };
        db.users().update_partial(&user.id, &update).await.unwrap();

        let stored = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("0803"));
        assert_eq!(stored.full_name, user.full_name);
        assert_eq!(stored.address, None);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let db = test_db().await;
        let update = ProfileUpdate {
            phone: Some("1".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            db.users().update_partial("ghost", &update).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
