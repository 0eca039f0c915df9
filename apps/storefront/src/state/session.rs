//! # Session State
//!
//! The running client's `SessionStore`, backed by the SQLite auth stand-in.
//!
//! Every identity change in the shell goes through this store: commands never
//! touch accounts or vendor rows for the signed-in user directly.

use std::sync::Arc;

use bazaar_core::{UserProfile, VendorProfile};
use bazaar_session::{LocalBackend, Notice, SessionNotifier, SessionStore};

use crate::error::{ApiError, ApiResult, ErrorCode};

/// Wrapper around the session store.
pub struct SessionState {
    store: SessionStore<LocalBackend>,
}

impl SessionState {
    pub fn new(store: SessionStore<LocalBackend>) -> Self {
        SessionState { store }
    }

    /// Returns a reference to the inner store.
    pub fn inner(&self) -> &SessionStore<LocalBackend> {
        &self.store
    }

    /// The local auth backend (OAuth callback, recovery mailbox).
    pub fn backend(&self) -> &Arc<LocalBackend> {
        self.store.backend()
    }

    /// The signed-in user, or `Unauthorized`.
    pub fn require_user(&self) -> ApiResult<UserProfile> {
        self.store.user().ok_or_else(|| {
            ApiError::new(ErrorCode::Unauthorized, "You must be signed in to do that")
        })
    }

    /// The signed-in user's vendor row, or `Forbidden`.
    pub fn require_vendor(&self) -> ApiResult<VendorProfile> {
        self.require_user()?;
        self.store
            .vendor()
            .ok_or_else(|| ApiError::forbidden("You need a vendor account to do that"))
    }

    /// Succeeds only while the admin flag is set.
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.store.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin access required"))
        }
    }
}

/// Prints session notices to stdout as they happen.
pub struct ConsoleNotifier;

impl SessionNotifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        println!("{}", notice);
    }
}
