//! # Local Backend
//!
//! A self-hosted stand-in for the hosted auth/database service, backed by
//! the SQLite tables in bazaar-db.
//!
//! ## Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Password sign-in                                                       │
//! │    auth_accounts ──argon2 verify──► issue JWT ──► auth_sessions row     │
//! │                                         │                               │
//! │                                         └──► push SignedIn              │
//! │                                                                         │
//! │  OAuth                                                                  │
//! │    sign_in_with_oauth ──► authorize URL with one-time state             │
//! │    complete_oauth(state, email, name)                                   │
//! │      ──► account + profile row if missing ──► session ──► SignedIn      │
//! │                                                                         │
//! │  Recovery                                                               │
//! │    reset_password_for_email ──► password_resets token (1h), mailbox     │
//! │    verify_recovery(token) ──► session ──► push PasswordRecovery         │
//! │    update_password (needs session) ──► push UserUpdated                 │
//! │                                                                         │
//! │  Sign-out                                                               │
//! │    revoke auth_sessions row ──► drop cached session ──► SignedOut       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Like the hosted SDK, one `LocalBackend` is one client: it caches the
//! session it holds and `current_session` answers for that client only.
//!
//! The admin password is read from `settings` in plaintext.

use std::collections::HashMap;
use std::sync::Mutex;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use bazaar_core::validation::{validate_email, validate_password};
use bazaar_core::{
    AuthEvent, AuthSession, AuthUser, OAuthProvider, ProfileUpdate, UserProfile,
    VendorApplication, VendorProfile,
};
use bazaar_db::{AuthAccount, AuthSessionRecord, Database, DbError};
use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{AuthApi, ProfileApi};
use crate::config::AuthSettings;
use crate::error::{BackendError, BackendResult};
use crate::token::TokenIssuer;

/// Capacity of the pushed auth event channel.
const AUTH_EVENT_CAPACITY: usize = 32;

/// How long a recovery link stays valid.
const RECOVERY_LIFETIME_MINUTES: i64 = 60;

const PASSWORD_PROVIDER: &str = "email";

/// A recovery email the local service "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEmail {
    pub email: String,
    pub token: String,
    pub link: String,
}

/// Local implementation of [`AuthApi`] and [`ProfileApi`].
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("bazaar.db")).await?;
/// let backend = Arc::new(LocalBackend::new(db, &config.auth));
/// let store = SessionStore::new(backend, storage, notifier);
/// ```
pub struct LocalBackend {
    db: Database,
    tokens: TokenIssuer,
    min_password_length: usize,
    site_url: String,

    /// Session held by this client.
    current: Mutex<Option<AuthSession>>,

    /// Outstanding OAuth state values.
    oauth_states: Mutex<HashMap<String, OAuthProvider>>,

    /// Recovery emails not yet picked up.
    mailbox: Mutex<Vec<RecoveryEmail>>,

    events: broadcast::Sender<AuthEvent>,
}

impl LocalBackend {
    pub fn new(db: Database, settings: &AuthSettings) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        LocalBackend {
            db,
            tokens: TokenIssuer::new(settings.jwt_secret.clone(), settings.access_lifetime_secs),
            min_password_length: settings.min_password_length,
            site_url: settings.site_url.trim_end_matches('/').to_string(),
            current: Mutex::new(None),
            oauth_states: Mutex::new(HashMap::new()),
            mailbox: Mutex::new(Vec::new()),
            events,
        }
    }

    /// The database behind this service.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Provider Callbacks
    // =========================================================================

    /// Plays the OAuth provider's redirect back to the site.
    ///
    /// Consumes `state`, provisions an account and profile row on first
    /// sign-in, opens a session and pushes `SignedIn`.
    pub async fn complete_oauth(
        &self,
        state: &str,
        email: &str,
        display_name: &str,
    ) -> BackendResult<AuthSession> {
        let provider = self
            .lock_oauth_states()?
            .remove(state)
            .ok_or(BackendError::InvalidOAuthState)?;

        validate_email(email)?;
        let email = email.trim();

        let account = match self.db.accounts().get_by_email(email).await? {
            Some(account) => account,
            None => {
                let now = Utc::now();
                let account = AuthAccount {
                    id: Uuid::new_v4().to_string(),
                    email: email.to_string(),
                    password_hash: None,
                    provider: provider.as_str().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.db.accounts().insert(&account).await?;
                info!(provider = provider.as_str(), account_id = %account.id, "OAuth account created");
                account
            }
        };

        if self.db.users().get_by_id(&account.id).await?.is_none() {
            let now = Utc::now();
            let name = display_name.trim();
            let profile = UserProfile {
                id: account.id.clone(),
                email: account.email.clone(),
                full_name: if name.is_empty() {
                    account.email.clone()
                } else {
                    name.to_string()
                },
                phone: None,
                address: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            };
            self.db.users().insert(&profile).await?;
        }

        let session = self.open_session(&account).await?;
        self.push(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Plays the user clicking the recovery link.
    ///
    /// Consumes the token, opens a session and pushes `PasswordRecovery`.
    pub async fn verify_recovery(&self, token: &str) -> BackendResult<AuthSession> {
        let account_id = self
            .db
            .accounts()
            .consume_reset(token)
            .await?
            .ok_or(BackendError::InvalidRecoveryLink)?;

        let account = self
            .db
            .accounts()
            .get_by_id(&account_id)
            .await?
            .ok_or(BackendError::InvalidRecoveryLink)?;

        let session = self.open_session(&account).await?;
        self.push(AuthEvent::PasswordRecovery(session.clone()));
        Ok(session)
    }

    /// Drains the local mailbox.
    pub fn take_recovery_emails(&self) -> Vec<RecoveryEmail> {
        self.mailbox
            .lock()
            .map(|mut mailbox| std::mem::take(&mut *mailbox))
            .unwrap_or_default()
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Issues a token, records the session row, and caches it.
    async fn open_session(&self, account: &AuthAccount) -> BackendResult<AuthSession> {
        if let Some(previous) = self.cached_session()? {
            self.revoke(&previous).await;
        }

        let issued = self.tokens.issue(&account.id, &account.email)?;

        self.db
            .accounts()
            .insert_session(&AuthSessionRecord {
                id: issued.claims.jti.clone(),
                account_id: account.id.clone(),
                issued_at: issued.issued_at,
                expires_at: issued.expires_at,
                revoked_at: None,
            })
            .await?;

        let session = AuthSession {
            access_token: issued.token,
            expires_at: issued.expires_at,
            user: AuthUser {
                id: account.id.clone(),
                email: account.email.clone(),
            },
        };

        *self.lock_current()? = Some(session.clone());
        info!(account_id = %account.id, "Session opened");
        Ok(session)
    }

    /// Best-effort revocation of a session's row.
    async fn revoke(&self, session: &AuthSession) {
        let jti = match self.tokens.validate(&session.access_token) {
            Ok(claims) => claims.jti,
            Err(_) => return,
        };

        if let Err(e) = self.db.accounts().revoke_session(&jti).await {
            warn!(error = %e, "Failed to revoke session row");
        }
    }

    /// The cached session if its token and row are still live.
    async fn live_session(&self) -> BackendResult<Option<AuthSession>> {
        let session = match self.cached_session()? {
            Some(session) => session,
            None => return Ok(None),
        };

        let live = match self.tokens.validate(&session.access_token) {
            Ok(claims) => self
                .db
                .accounts()
                .get_session(&claims.jti)
                .await?
                .map(|record| record.is_live(Utc::now()))
                .unwrap_or(false),
            Err(_) => false,
        };

        if live {
            Ok(Some(session))
        } else {
            debug!("Cached session expired or revoked, dropping it");
            *self.lock_current()? = None;
            Ok(None)
        }
    }

    /// Row-level policy: a user may only write rows they own.
    async fn require_owner(&self, user_id: &str) -> BackendResult<()> {
        match self.live_session().await? {
            Some(session) if session.user.id == user_id => Ok(()),
            _ => Err(BackendError::Rejected(
                "new row violates row-level security policy".to_string(),
            )),
        }
    }

    fn hash_password(password: &str) -> BackendResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| BackendError::Internal(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn push(&self, event: AuthEvent) {
        // No subscribers is fine; nobody is listening yet.
        if self.events.send(event).is_err() {
            debug!("Auth event dropped, no subscribers");
        }
    }

    fn cached_session(&self) -> BackendResult<Option<AuthSession>> {
        Ok(self.lock_current()?.clone())
    }

    fn lock_current(&self) -> BackendResult<std::sync::MutexGuard<'_, Option<AuthSession>>> {
        self.current
            .lock()
            .map_err(|_| BackendError::Internal("session cache poisoned".to_string()))
    }

    fn lock_oauth_states(
        &self,
    ) -> BackendResult<std::sync::MutexGuard<'_, HashMap<String, OAuthProvider>>> {
        self.oauth_states
            .lock()
            .map_err(|_| BackendError::Internal("OAuth state map poisoned".to_string()))
    }
}

// =============================================================================
// AuthApi
// =============================================================================

#[async_trait]
impl AuthApi for LocalBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        validate_email(email)?;
        validate_password(password, self.min_password_length)?;
        let email = email.trim();

        if self.db.accounts().get_by_email(email).await?.is_some() {
            return Err(BackendError::UserAlreadyRegistered);
        }

        let now = Utc::now();
        let account = AuthAccount {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: Some(Self::hash_password(password)?),
            provider: PASSWORD_PROVIDER.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.db
            .accounts()
            .insert(&account)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => BackendError::UserAlreadyRegistered,
                other => other.into(),
            })?;

        info!(account_id = %account.id, "Account created");
        Ok(AuthUser {
            id: account.id,
            email: account.email,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let account = self
            .db
            .accounts()
            .get_by_email(email.trim())
            .await?
            .ok_or(BackendError::InvalidCredentials)?;

        let verified = account
            .password_hash
            .as_deref()
            .map(|hash| Self::verify_password(password, hash))
            .unwrap_or(false);

        if !verified {
            debug!(account_id = %account.id, "Password check failed");
            return Err(BackendError::InvalidCredentials);
        }

        let session = self.open_session(&account).await?;
        self.push(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> BackendResult<String> {
        let state = Uuid::new_v4().simple().to_string();
        self.lock_oauth_states()?.insert(state.clone(), provider);

        debug!(provider = provider.as_str(), "OAuth flow started");
        Ok(format!(
            "{}/auth/v1/authorize?provider={}&state={}",
            self.site_url,
            provider.as_str(),
            state
        ))
    }

    async fn current_session(&self) -> BackendResult<Option<AuthSession>> {
        self.live_session().await
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let session = self.lock_current()?.take();

        match session {
            Some(session) => {
                self.revoke(&session).await;
                info!(account_id = %session.user.id, "Signed out");
                self.push(AuthEvent::SignedOut);
            }
            None => debug!("Sign-out without a session"),
        }

        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()> {
        validate_email(email)?;
        let email = email.trim();

        // Same answer whether or not the account exists.
        let account = match self.db.accounts().get_by_email(email).await? {
            Some(account) => account,
            None => {
                debug!("Recovery requested for unknown email");
                return Ok(());
            }
        };

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::minutes(RECOVERY_LIFETIME_MINUTES);
        self.db
            .accounts()
            .insert_reset(&token, &account.id, expires_at)
            .await?;

        let link = format!("{}/reset-password#token={}", self.site_url, token);
        info!(account_id = %account.id, "Recovery email issued");

        if let Ok(mut mailbox) = self.mailbox.lock() {
            mailbox.push(RecoveryEmail {
                email: account.email,
                token,
                link,
            });
        }

        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> BackendResult<()> {
        let session = self
            .live_session()
            .await?
            .ok_or(BackendError::SessionMissing)?;

        validate_password(new_password, self.min_password_length)?;

        let hash = Self::hash_password(new_password)?;
        self.db
            .accounts()
            .update_password_hash(&session.user.id, &hash)
            .await?;

        info!(account_id = %session.user.id, "Password updated");
        self.push(AuthEvent::UserUpdated(session));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// ProfileApi
// =============================================================================

#[async_trait]
impl ProfileApi for LocalBackend {
    async fn fetch_user(&self, user_id: &str) -> BackendResult<Option<UserProfile>> {
        Ok(self.db.users().get_by_id(user_id).await?)
    }

    async fn insert_user(&self, profile: &UserProfile) -> BackendResult<UserProfile> {
        Ok(self.db.users().insert(profile).await?)
    }

    async fn update_user(&self, user_id: &str, update: &ProfileUpdate) -> BackendResult<()> {
        self.require_owner(user_id).await?;
        Ok(self.db.users().update_partial(user_id, update).await?)
    }

    async fn fetch_vendor(&self, user_id: &str) -> BackendResult<Option<VendorProfile>> {
        Ok(self.db.vendors().get_by_user_id(user_id).await?)
    }

    async fn insert_vendor(
        &self,
        user_id: &str,
        application: &VendorApplication,
    ) -> BackendResult<VendorProfile> {
        self.require_owner(user_id).await?;
        Ok(self.db.vendors().insert(user_id, application).await?)
    }

    async fn fetch_admin_password(&self) -> BackendResult<Option<String>> {
        Ok(self.db.settings().admin_password().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
