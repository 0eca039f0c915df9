//! # Account Repository
//!
//! Storage for the auth provider itself: credentials, issued sessions and
//! password recovery tokens. Profile data lives in `users`; this table only
//! knows how to prove who someone is.
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sign in ──► insert_session(jti) ──► get_session(jti) while valid      │
//! │                                          │                              │
//! │  sign out ──────────────────────────► revoke_session(jti)               │
//! │                                                                         │
//! │  forgot password ──► insert_reset(token, +1h)                           │
//! │  recovery link   ──► consume_reset(token) ── once, before expiry        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A credential record owned by the auth provider.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AuthAccount {
    pub id: String,
    pub email: String,
    /// argon2 PHC string. `None` for OAuth-only accounts.
    pub password_hash: Option<String>,
    /// `email`, `google`, `github`.
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An issued access token, keyed by its JWT id.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AuthSessionRecord {
    pub id: String,
    pub account_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AuthSessionRecord {
    /// Not revoked and not expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Repository for auth provider records.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Looks up an account by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<AuthAccount>> {
        let account = sqlx::query_as::<_, AuthAccount>(
            r#"
            SELECT id, email, password_hash, provider, created_at, updated_at
            FROM auth_accounts
            WHERE email = ?1
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<AuthAccount>> {
        let account = sqlx::query_as::<_, AuthAccount>(
            r#"
            SELECT id, email, password_hash, provider, created_at, updated_at
            FROM auth_accounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Inserts an account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn insert(&self, account: &AuthAccount) -> DbResult<()> {
        debug!(id = %account.id, provider = %account.provider, "Inserting auth account");

        sqlx::query(
            r#"
            INSERT INTO auth_accounts (id, email, password_hash, provider, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.provider)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: account.email.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    pub async fn update_password_hash(&self, id: &str, password_hash: &str) -> DbResult<()> {
        debug!(id = %id, "Updating account password");

        let result = sqlx::query(
            r#"
            UPDATE auth_accounts
            SET password_hash = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub async fn insert_session(&self, session: &AuthSessionRecord) -> DbResult<()> {
        debug!(jti = %session.id, account_id = %session.account_id, "Recording auth session");

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (id, account_id, issued_at, expires_at, revoked_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&session.id)
        .bind(&session.account_id)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_session(&self, jti: &str) -> DbResult<Option<AuthSessionRecord>> {
        let session = sqlx::query_as::<_, AuthSessionRecord>(
            r#"
            SELECT id, account_id, issued_at, expires_at, revoked_at
            FROM auth_sessions
            WHERE id = ?1
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Marks a session revoked. Revoking twice is a no-op.
    pub async fn revoke_session(&self, jti: &str) -> DbResult<()> {
        debug!(jti = %jti, "Revoking auth session");

        let result = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET revoked_at = COALESCE(revoked_at, ?2)
            WHERE id = ?1
            "#,
        )
        .bind(jti)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session", jti));
        }

        Ok(())
    }

    // =========================================================================
    // Password Recovery
    // =========================================================================

    pub async fn insert_reset(
        &self,
        token: &str,
        account_id: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(account_id = %account_id, "Recording password reset token");

        sqlx::query(
            r#"
            INSERT INTO password_resets (token, account_id, expires_at, used_at)
            VALUES (?1, ?2, ?3, NULL)
            "#,
        )
        .bind(token)
        .bind(account_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Consumes a recovery token, returning its account id.
    ///
    /// ## Returns
    /// * `Ok(Some(account_id))` - token existed, was unused and unexpired
    /// * `Ok(None)` - anything else; the token is left as it was
    pub async fn consume_reset(&self, token: &str) -> DbResult<Option<String>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, DateTime<Utc>, Option<DateTime<Utc>>)> = sqlx::query_as(
            r#"
            SELECT account_id, expires_at, used_at
            FROM password_resets
            WHERE token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let account_id = match row {
            Some((account_id, expires_at, None)) if expires_at > now => account_id,
            _ => return Ok(None),
        };

        sqlx::query("UPDATE password_resets SET used_at = ?2 WHERE token = ?1")
            .bind(token)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(account_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_user, test_db};
    use chrono::Duration;

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let db = test_db().await;
        seed_user(&db, "ada@example.com").await;

        let now = Utc::now();
        let dup = AuthAccount {
            id: "other".to_string(),
            email: "ADA@example.com".to_string(),
            password_hash: None,
            provider: "email".to_string(),
            created_at: now,
            updated_at: now,
        };

        match db.accounts().insert(&dup).await {
            Err(DbError::UniqueViolation { value, .. }) => assert_eq!(value, "ADA@example.com"),
            other => panic!("expected unique violation, got {:?}", other),
        }

        let found = db.accounts().get_by_email("Ada@Example.com").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_session_revocation() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let now = Utc::now();

        let record = AuthSessionRecord {
            id: "jti-1".to_string(),
            account_id: user.id.clone(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
            revoked_at: None,
        };
        db.accounts().insert_session(&record).await.unwrap();

        let stored = db.accounts().get_session("jti-1").await.unwrap().unwrap();
        assert!(stored.is_live(Utc::now()));

        db.accounts().revoke_session("jti-1").await.unwrap();
        db.accounts().revoke_session("jti-1").await.unwrap();

        let stored = db.accounts().get_session("jti-1").await.unwrap().unwrap();
        assert!(!stored.is_live(Utc::now()));

        assert!(matches!(
            db.accounts().revoke_session("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;

        db.accounts()
            .insert_reset("tok", &user.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(
            db.accounts().consume_reset("tok").await.unwrap(),
            Some(user.id.clone())
        );
        assert_eq!(db.accounts().consume_reset("tok").await.unwrap(), None);
        assert_eq!(db.accounts().consume_reset("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_reset_token_is_refused() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;

        db.accounts()
            .insert_reset("old", &user.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(db.accounts().consume_reset("old").await.unwrap(), None);
    }
}
