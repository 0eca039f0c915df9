//! # Backend Traits
//!
//! The surface of the hosted auth/database service that the session store
//! depends on.
//!
//! ## Seams
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SessionStore<B: Backend>                                              │
//! │         │                                                               │
//! │         ├── AuthApi      sign up / in / out, OAuth, recovery,           │
//! │         │                current session, pushed AuthEvents             │
//! │         │                                                               │
//! │         └── ProfileApi   users / vendors rows, admin password setting   │
//! │                                                                         │
//! │   Implementations:                                                      │
//! │     LocalBackend    (this crate, SQLite via bazaar-db)                  │
//! │     test fakes      (in-memory, tests/)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error returned here is treated as final and user-displayable.

use async_trait::async_trait;
use bazaar_core::{
    AuthEvent, AuthSession, AuthUser, OAuthProvider, ProfileUpdate, UserProfile,
    VendorApplication, VendorProfile,
};
use tokio::sync::broadcast;

use crate::error::BackendResult;

/// Identity operations of the auth provider.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Creates an account. Does not open a session.
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;

    /// Checks credentials and opens a session. Pushes `SignedIn`.
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;

    /// Starts an OAuth flow and returns the URL to send the user to.
    ///
    /// Completion arrives later as a pushed `SignedIn` event.
    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> BackendResult<String>;

    /// The session this client currently holds, if it is still valid.
    async fn current_session(&self) -> BackendResult<Option<AuthSession>>;

    /// Ends the current session. Pushes `SignedOut`.
    async fn sign_out(&self) -> BackendResult<()>;

    /// Sends a password recovery email. Succeeds for unknown emails too.
    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()>;

    /// Changes the password of the signed-in account.
    async fn update_password(&self, new_password: &str) -> BackendResult<()>;

    /// Subscribes to pushed session changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Row access to the profile tables.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch_user(&self, user_id: &str) -> BackendResult<Option<UserProfile>>;

    async fn insert_user(&self, profile: &UserProfile) -> BackendResult<UserProfile>;

    /// Writes the fields set in `update`.
    async fn update_user(&self, user_id: &str, update: &ProfileUpdate) -> BackendResult<()>;

    async fn fetch_vendor(&self, user_id: &str) -> BackendResult<Option<VendorProfile>>;

    /// Inserts an unapproved vendor row owned by `user_id`.
    async fn insert_vendor(
        &self,
        user_id: &str,
        application: &VendorApplication,
    ) -> BackendResult<VendorProfile>;

    /// The stored admin password, in plaintext.
    async fn fetch_admin_password(&self) -> BackendResult<Option<String>>;
}

/// Everything the session store needs from the service.
pub trait Backend: AuthApi + ProfileApi {}

impl<T: AuthApi + ProfileApi> Backend for T {}
