//! # Session Store
//!
//! The single authority for who is using this client.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SessionStore<B>                                 │
//! │                                                                         │
//! │  sign_in / sign_out / admin_login / ...        pushed AuthEvents        │
//! │        │  (await backend, then enqueue)              │ (listener task)  │
//! │        ▼                                             ▼                  │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │             mpsc queue of SessionEvent (single writer)           │  │
//! │  └───────────────────────────────┬──────────────────────────────────┘  │
//! │                                  ▼                                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  reducer task:  Session::apply(event)                            │  │
//! │  │                 persisted slice changed? ──► SessionStorage::save│  │
//! │  │                 publish ──► watch::Sender<Session>               │  │
//! │  │                 ack the caller                                   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Reads: snapshot() / subscribe() on the watch channel                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Queue order is the merge rule: whichever event is enqueued last wins.
//! Pushed events are only acted on if they still describe the provider's
//! current session, checked under the same gate that imperative sign-in and
//! sign-out hold, so a late `SignedIn` cannot resurrect a signed-out user.
//!
//! ## Failures
//! Every operation emits a [`Notice`] and returns `Err` on failure without
//! touching identity state. Profile reloads are the exception: their failures
//! are logged and swallowed, leaving the previous profile in place.
//!
//! ## Admin Check
//! `admin_login` compares the input with the stored admin password by plain
//! string equality. The stored value is readable by any client with database
//! access and guesses are not throttled.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bazaar_core::validation::{
    validate_email, validate_full_name, validate_password, validate_profile_update,
    validate_vendor_application,
};
use bazaar_core::{
    AuthEvent, AuthSession, AuthUser, OAuthProvider, ProfileUpdate, Session, SessionEvent,
    UserProfile, VendorApplication, VendorProfile, MIN_PASSWORD_LENGTH,
};
use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::error::{SessionError, SessionResult};
use crate::notice::{Notice, SessionNotifier};
use crate::storage::SessionStorage;

/// Capacity of the session event queue.
const EVENT_QUEUE_CAPACITY: usize = 64;

/// One queued state change and the caller waiting for it to land.
struct Dispatch {
    event: SessionEvent,
    applied: oneshot::Sender<()>,
}

/// State shared between the store and its listener task.
struct Shared<B> {
    backend: Arc<B>,
    notifier: Arc<dyn SessionNotifier>,
    events: mpsc::Sender<Dispatch>,
    state: watch::Receiver<Session>,

    /// Held while checking the provider session and enqueueing the result.
    auth_gate: Mutex<()>,
}

/// Process-wide identity state, backed by a [`Backend`].
///
/// ## Usage
/// ```rust,ignore
/// let store = SessionStore::new(backend, storage, Arc::new(NoOpNotifier));
/// store.initialize().await?;
///
/// store.sign_in("ada@example.com", "secret1").await?;
/// assert!(store.user().is_some());
/// ```
///
/// Must be created inside a Tokio runtime.
pub struct SessionStore<B: Backend + 'static> {
    shared: Arc<Shared<B>>,
    min_password_length: usize,
    initialize_started: AtomicBool,
    reducer: JoinHandle<()>,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<B: Backend + 'static> SessionStore<B> {
    /// Creates the store, restoring the persisted slice from `storage`.
    ///
    /// An unreadable persisted slice is logged and treated as absent.
    pub fn new(
        backend: Arc<B>,
        storage: Arc<dyn SessionStorage>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        let initial = match storage.load() {
            Ok(Some(persisted)) => {
                debug!(is_admin = persisted.is_admin, "Restored persisted session");
                Session::restored(&persisted)
            }
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                Session::default()
            }
        };

        let (state_tx, state_rx) = watch::channel(initial);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let reducer = tokio::spawn(run_reducer(events_rx, state_tx, storage));

        SessionStore {
            shared: Arc::new(Shared {
                backend,
                notifier,
                events: events_tx,
                state: state_rx,
                auth_gate: Mutex::new(()),
            }),
            min_password_length: MIN_PASSWORD_LENGTH,
            initialize_started: AtomicBool::new(false),
            reducer,
            listener: std::sync::Mutex::new(None),
        }
    }

    /// Overrides the minimum password length for sign-up and reset.
    pub fn with_min_password_length(mut self, min: usize) -> Self {
        self.min_password_length = min;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Loads the current provider session and starts following pushed
    /// auth events. Only the first call does anything.
    pub async fn initialize(&self) -> SessionResult<()> {
        if self.initialize_started.swap(true, Ordering::SeqCst) {
            debug!("Session store already initialized");
            return Ok(());
        }

        info!("Initializing session store");

        // Subscribe first so nothing pushed during the load is missed.
        let events = self.shared.backend.subscribe();

        if let Err(e) = self.shared.dispatch(SessionEvent::LoadingStarted).await {
            // Nothing was started; let a later call try again.
            self.initialize_started.store(false, Ordering::SeqCst);
            return Err(e);
        }
        {
            let _gate = self.shared.auth_gate.lock().await;
            match self.shared.backend.current_session().await {
                Ok(Some(session)) => self.shared.load_user_profile(&session.user.id).await,
                Ok(None) => debug!("No provider session at startup"),
                Err(e) => warn!(error = %e, "Failed to fetch provider session"),
            }
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { shared.follow(events).await });
        if let Ok(mut listener) = self.listener.lock() {
            *listener = Some(handle);
        }

        self.shared.dispatch(SessionEvent::LoadingFinished).await?;
        self.shared.dispatch(SessionEvent::Initialized).await
    }

    // =========================================================================
    // Auth Operations
    // =========================================================================

    /// Creates an account and its profile row. Does not sign in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> SessionResult<AuthUser> {
        self.track("sign_up", "Account created. You can now sign in.", async {
            validate_email(email)?;
            validate_password(password, self.min_password_length)?;
            validate_full_name(full_name)?;

            let account = self.shared.backend.sign_up(email, password).await?;

            let now = Utc::now();
            let profile = UserProfile {
                id: account.id.clone(),
                email: account.email.clone(),
                full_name: full_name.trim().to_string(),
                phone: None,
                address: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            };
            self.shared.backend.insert_user(&profile).await?;

            Ok(account)
        })
        .await
    }

    /// Checks credentials, then loads the profile.
    pub async fn sign_in(&self, email: &str, password: &str) -> SessionResult<()> {
        self.track("sign_in", "Signed in successfully", async {
            let _gate = self.shared.auth_gate.lock().await;
            let session = self
                .shared
                .backend
                .sign_in_with_password(email, password)
                .await?;
            self.shared.load_user_profile(&session.user.id).await;
            Ok(())
        })
        .await
    }

    /// Starts an OAuth sign-in and returns the URL to open.
    ///
    /// The sign-in itself lands later as a pushed event.
    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> SessionResult<String> {
        self.track("sign_in_with_oauth", "Redirecting to sign-in provider", async {
            Ok(self.shared.backend.sign_in_with_oauth(provider).await?)
        })
        .await
    }

    /// Ends the provider session and clears user, vendor and admin.
    ///
    /// On failure the local state is left as it was.
    pub async fn sign_out(&self) -> SessionResult<()> {
        self.track("sign_out", "Signed out", async {
            let _gate = self.shared.auth_gate.lock().await;
            self.shared.backend.sign_out().await?;
            self.shared.dispatch(SessionEvent::SignedOut).await
        })
        .await
    }

    /// Asks the provider to email a recovery link.
    pub async fn forgot_password(&self, email: &str) -> SessionResult<()> {
        self.track("forgot_password", "Password reset email sent", async {
            validate_email(email)?;
            Ok(self.shared.backend.reset_password_for_email(email).await?)
        })
        .await
    }

    /// Sets a new password for the current provider session.
    pub async fn reset_password(&self, new_password: &str) -> SessionResult<()> {
        self.track("reset_password", "Password updated", async {
            validate_password(new_password, self.min_password_length)?;
            Ok(self.shared.backend.update_password(new_password).await?)
        })
        .await
    }

    // =========================================================================
    // Profile Operations
    // =========================================================================

    /// Writes the set fields of `update`, then merges them locally.
    pub async fn update_profile(&self, update: ProfileUpdate) -> SessionResult<()> {
        let user = self.require_user()?;

        self.track("update_profile", "Profile updated", async {
            validate_profile_update(&update)?;
            self.shared.backend.update_user(&user.id, &update).await?;
            self.shared
                .dispatch(SessionEvent::ProfileUpdated {
                    user_id: user.id.clone(),
                    update,
                })
                .await
        })
        .await
    }

    /// Registers the current user as a vendor, pending approval.
    pub async fn become_vendor(
        &self,
        application: VendorApplication,
    ) -> SessionResult<VendorProfile> {
        let user = self.require_user()?;

        self.track(
            "become_vendor",
            "Vendor application submitted. Awaiting approval.",
            async {
                validate_vendor_application(&application)?;
                let vendor = self
                    .shared
                    .backend
                    .insert_vendor(&user.id, &application)
                    .await?;
                self.shared
                    .dispatch(SessionEvent::VendorCreated(vendor.clone()))
                    .await?;
                Ok(vendor)
            },
        )
        .await
    }

    /// Re-reads the user and vendor rows, e.g. to pick up an approval.
    pub async fn refresh_profile(&self) -> SessionResult<()> {
        let user = self.require_user()?;
        self.shared.load_user_profile(&user.id).await;
        Ok(())
    }

    /// Grants admin if `password` equals the stored admin password exactly.
    ///
    /// A mismatch, a missing value and a failed lookup all read as
    /// "Invalid admin password" and leave `is_admin` unchanged.
    pub async fn admin_login(&self, password: &str) -> SessionResult<()> {
        self.track("admin_login", "Welcome, admin", async {
            let stored = match self.shared.backend.fetch_admin_password().await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(error = %e, "Admin password lookup failed");
                    None
                }
            };

            match stored {
                Some(stored) if stored == password => {
                    self.shared.dispatch(SessionEvent::AdminGranted).await
                }
                _ => Err(SessionError::InvalidAdminPassword),
            }
        })
        .await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state.
    pub fn snapshot(&self) -> Session {
        self.shared.state.borrow().clone()
    }

    /// A receiver that sees every published state.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.state.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.shared.state.borrow().user.clone()
    }

    pub fn vendor(&self) -> Option<VendorProfile> {
        self.shared.state.borrow().vendor.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.shared.state.borrow().is_admin
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.shared.backend
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn require_user(&self) -> SessionResult<UserProfile> {
        match self.user() {
            Some(user) => Ok(user),
            None => {
                let err = SessionError::NotSignedIn;
                self.shared.notifier.notify(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Runs `op` between loading markers and reports its outcome.
    async fn track<T, F>(&self, name: &'static str, success: &str, op: F) -> SessionResult<T>
    where
        F: Future<Output = SessionResult<T>>,
    {
        self.shared.dispatch(SessionEvent::LoadingStarted).await?;
        let result = op.await;
        self.shared.dispatch(SessionEvent::LoadingFinished).await?;

        match &result {
            Ok(_) => {
                info!(op = name, "Session operation succeeded");
                self.shared.notifier.notify(Notice::success(success));
            }
            Err(e) => {
                warn!(op = name, error = %e, "Session operation failed");
                self.shared.notifier.notify(Notice::error(e.to_string()));
            }
        }

        result
    }
}

impl<B: Backend + 'static> Drop for SessionStore<B> {
    fn drop(&mut self) {
        self.reducer.abort();
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

impl<B: Backend + 'static> Shared<B> {
    /// Enqueues an event and waits until the reducer has applied it.
    async fn dispatch(&self, event: SessionEvent) -> SessionResult<()> {
        let (applied, done) = oneshot::channel();

        self.events
            .send(Dispatch { event, applied })
            .await
            .map_err(|_| SessionError::Closed)?;

        done.await.map_err(|_| SessionError::Closed)
    }

    /// Fetches the user row and optional vendor row and applies them as one
    /// event. Failures are logged and leave the previous profile in place.
    async fn load_user_profile(&self, user_id: &str) {
        let user = match self.backend.fetch_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user_id = %user_id, "No profile row for signed-in user");
                return;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load user profile");
                return;
            }
        };

        let vendor = match self.backend.fetch_vendor(user_id).await {
            Ok(vendor) => vendor,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load vendor profile");
                return;
            }
        };

        debug!(user_id = %user_id, is_vendor = vendor.is_some(), "Profile loaded");
        if let Err(e) = self.dispatch(SessionEvent::ProfileLoaded { user, vendor }).await {
            error!(error = %e, "Failed to apply loaded profile");
        }
    }

    /// Follows pushed auth events until the backend closes the channel.
    async fn follow(self: Arc<Self>, mut events: broadcast::Receiver<AuthEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.on_auth_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth event listener lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("Auth event channel closed");
                    break;
                }
            }
        }
    }

    async fn on_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session)
            | AuthEvent::PasswordRecovery(session)
            | AuthEvent::UserUpdated(session) => {
                let _gate = self.auth_gate.lock().await;
                if self.is_current(&session).await {
                    self.load_user_profile(&session.user.id).await;
                } else {
                    debug!("Ignoring pushed sign-in for a session that has ended");
                }
            }
            AuthEvent::SignedOut => {
                let _gate = self.auth_gate.lock().await;
                let has_user = self.state.borrow().user.is_some();
                let provider_signed_out = matches!(self.backend.current_session().await, Ok(None));

                if has_user && provider_signed_out {
                    if let Err(e) = self.dispatch(SessionEvent::SignedOut).await {
                        error!(error = %e, "Failed to apply pushed sign-out");
                    }
                }
            }
        }
    }

    /// Whether `session` still belongs to the provider's current user.
    async fn is_current(&self, session: &AuthSession) -> bool {
        match self.backend.current_session().await {
            Ok(Some(current)) => current.user.id == session.user.id,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to check provider session");
                false
            }
        }
    }
}

// =============================================================================
// Reducer Task
// =============================================================================

/// Applies queued events in order, persisting the admin slice when it
/// changes and publishing every new state.
///
/// Saves run on the blocking pool and are awaited before the next event, so
/// the file always holds the latest slice.
async fn run_reducer(
    mut events: mpsc::Receiver<Dispatch>,
    state: watch::Sender<Session>,
    storage: Arc<dyn SessionStorage>,
) {
    while let Some(Dispatch { event, applied }) = events.recv().await {
        let before = state.borrow().persisted();

        state.send_modify(|session| session.apply(event));

        let after = state.borrow().persisted();
        if after != before {
            let writer = Arc::clone(&storage);
            match tokio::task::spawn_blocking(move || writer.save(&after)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Failed to persist session"),
                Err(e) => warn!(error = %e, "Session persist task failed"),
            }
        }

        // The caller may have given up waiting.
        let _ = applied.send(());
    }

    debug!("Session reducer stopped");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::local::LocalBackend;
    use crate::notice::NoOpNotifier;
    use crate::storage::{FileSessionStorage, MemorySessionStorage};
    use bazaar_core::PersistedSession;
    use bazaar_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_reducer_persists_only_on_change() {
        let storage = Arc::new(MemorySessionStorage::new());
        let (state_tx, state_rx) = watch::channel(Session::default());
        let (events_tx, events_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_reducer(events_rx, state_tx, storage.clone()));

        for event in [
            SessionEvent::LoadingStarted,
            SessionEvent::AdminGranted,
            SessionEvent::AdminGranted,
            SessionEvent::LoadingFinished,
        ] {
            let (applied, done) = oneshot::channel();
            events_tx.send(Dispatch { event, applied }).await.unwrap();
            done.await.unwrap();
        }

        assert!(state_rx.borrow().is_admin);
        assert_eq!(storage.save_count(), 1);
        assert_eq!(storage.stored(), Some(PersistedSession::new(true)));

        drop(events_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reducer_writes_file_storage() {
        let path = std::env::temp_dir()
            .join(format!("bazaar-store-{}", uuid::Uuid::new_v4()))
            .join("session.json");
        let storage = Arc::new(FileSessionStorage::new(&path));
        let (state_tx, _state_rx) = watch::channel(Session::default());
        let (events_tx, events_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_reducer(events_rx, state_tx, storage.clone()));

        for (event, is_admin) in [
            (SessionEvent::AdminGranted, true),
            (SessionEvent::SignedOut, false),
        ] {
            let (applied, done) = oneshot::channel();
            events_tx.send(Dispatch { event, applied }).await.unwrap();
            done.await.unwrap();

            // The save is awaited before the ack, so the file is current.
            assert_eq!(storage.load().unwrap(), Some(PersistedSession::new(is_admin)));
        }

        drop(events_tx);
        task.await.unwrap();
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn test_initialize_can_retry_after_closed_queue() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let backend = Arc::new(LocalBackend::new(db, &AuthSettings::default()));
        let mut store = SessionStore::new(
            backend,
            Arc::new(MemorySessionStorage::new()),
            Arc::new(NoOpNotifier),
        );

        let reducer = std::mem::replace(&mut store.reducer, tokio::spawn(async {}));
        reducer.abort();
        let _ = reducer.await;

        assert!(matches!(store.initialize().await, Err(SessionError::Closed)));
        assert!(!store.initialize_started.load(Ordering::SeqCst));

        // A second call must try again rather than report success.
        assert!(matches!(store.initialize().await, Err(SessionError::Closed)));
        assert!(store.listener.lock().unwrap().is_none());
    }
}
