//! # Session State
//!
//! The record of who is using this client, and the reducer that is the only
//! way to change it.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Anonymous ──ProfileLoaded──► Authenticated(user)                      │
//! │       ▲                              │                                  │
//! │       │                        VendorCreated                            │
//! │       │                              ▼                                  │
//! │       │                   Authenticated(user, vendor unapproved)        │
//! │       │                              │                                  │
//! │       │                    admin approval (reloaded)                    │
//! │       │                              ▼                                  │
//! │       │                   Authenticated(user, vendor approved)          │
//! │       │                              │                                  │
//! │       └────────────SignedOut─────────┘                                  │
//! │                                                                         │
//! │   is_admin: orthogonal overlay. AdminGranted sets it, only SignedOut    │
//! │   clears it.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Rule
//! Imperative operations and pushed auth events both become
//! [`SessionEvent`]s on a single queue. [`Session::apply`] is applied to them
//! in queue order, so "last enqueued wins" is a property of this reducer
//! rather than of task scheduling.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::persist::PersistedSession;
use crate::types::{ProfileUpdate, UserProfile, VendorProfile};

// =============================================================================
// Session
// =============================================================================

/// Current identity of the running client.
///
/// ## Invariant
/// `vendor` is `Some` only while `user` is `Some` and
/// `vendor.user_id == user.id`. The reducer refuses any event that would
/// break this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub vendor: Option<VendorProfile>,
    /// Granted by the admin password check. Survives restarts.
    pub is_admin: bool,
    /// An identity operation is in flight.
    pub loading: bool,
    /// `initialize` has completed.
    pub initialized: bool,
}

/// Coarse position in the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
    VendorPending,
    VendorApproved,
}

// =============================================================================
// Events
// =============================================================================

/// Every state change the session can undergo.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoadingStarted,
    LoadingFinished,
    /// User row and optional vendor row fetched together.
    ProfileLoaded {
        user: UserProfile,
        vendor: Option<VendorProfile>,
    },
    /// A partial profile write was accepted by the backend.
    ProfileUpdated {
        user_id: String,
        update: ProfileUpdate,
    },
    /// A vendor row was inserted for the current user.
    VendorCreated(VendorProfile),
    /// The admin password check passed.
    AdminGranted,
    /// The provider session ended.
    SignedOut,
    /// `initialize` finished its first load.
    Initialized,
}

impl Session {
    /// Builds the startup state from the persisted slice.
    ///
    /// Only `is_admin` survives a restart; everything else is rebuilt by
    /// `initialize`.
    pub fn restored(persisted: &PersistedSession) -> Self {
        Session {
            is_admin: persisted.is_admin,
            ..Default::default()
        }
    }

    /// Applies one event.
    ///
    /// Pure and total: events that do not fit the current state are ignored.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::LoadingStarted => self.loading = true,
            SessionEvent::LoadingFinished => self.loading = false,
            SessionEvent::ProfileLoaded { user, vendor } => {
                self.vendor = vendor.filter(|v| v.user_id == user.id);
                self.user = Some(user);
            }
            SessionEvent::ProfileUpdated { user_id, update } => {
                if let Some(user) = self.user.as_mut().filter(|u| u.id == user_id) {
                    update.apply_to(user);
                }
            }
            SessionEvent::VendorCreated(vendor) => {
                let owned = self
                    .user
                    .as_ref()
                    .map(|u| u.id == vendor.user_id)
                    .unwrap_or(false);
                if owned {
                    self.vendor = Some(vendor);
                }
            }
            SessionEvent::AdminGranted => self.is_admin = true,
            SessionEvent::SignedOut => {
                self.user = None;
                self.vendor = None;
                self.is_admin = false;
            }
            SessionEvent::Initialized => self.initialized = true,
        }
    }

    /// The slice of this state that is written to disk.
    pub fn persisted(&self) -> PersistedSession {
        PersistedSession::new(self.is_admin)
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.user, &self.vendor) {
            (None, _) => SessionPhase::Anonymous,
            (Some(_), None) => SessionPhase::Authenticated,
            (Some(_), Some(v)) if v.is_approved => SessionPhase::VendorApproved,
            (Some(_), Some(_)) => SessionPhase::VendorPending,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            full_name: "Chidi Eze".to_string(),
            phone: None,
            address: None,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn vendor(user_id: &str, approved: bool) -> VendorProfile {
        VendorProfile {
            id: format!("v-{}", user_id),
            user_id: user_id.to_string(),
            business_name: "Eze Crafts".to_string(),
            business_email: "crafts@example.com".to_string(),
            business_phone: None,
            business_address: None,
            description: None,
            logo_url: None,
            banner_url: None,
            is_approved: approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn signed_in(id: &str) -> Session {
        let mut session = Session::default();
        session.apply(SessionEvent::ProfileLoaded {
            user: user(id),
            vendor: None,
        });
        session
    }

    #[test]
    fn test_profile_loaded_sets_user_and_vendor_together() {
        let mut session = Session::default();
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: Some(vendor("u1", false)),
        });

        assert_eq!(session.phase(), SessionPhase::VendorPending);
        assert_eq!(session.user.as_ref().map(|u| u.id.as_str()), Some("u1"));
    }

    #[test]
    fn test_profile_loaded_drops_foreign_vendor() {
        let mut session = Session::default();
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: Some(vendor("someone-else", true)),
        });

        assert!(session.vendor.is_none());
        assert_eq!(session.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn test_reload_replaces_stale_vendor() {
        let mut session = Session::default();
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: Some(vendor("u1", false)),
        });
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: Some(vendor("u1", true)),
        });

        assert_eq!(session.phase(), SessionPhase::VendorApproved);
    }

    #[test]
    fn test_signed_out_clears_everything_it_owns() {
        let mut session = Session::default();
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: Some(vendor("u1", true)),
        });
        session.apply(SessionEvent::AdminGranted);

        session.apply(SessionEvent::SignedOut);

        assert!(session.user.is_none());
        assert!(session.vendor.is_none());
        assert!(!session.is_admin);
        assert_eq!(session.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn test_signed_out_clears_admin_without_user() {
        let mut session = Session::default();
        session.apply(SessionEvent::AdminGranted);
        assert!(session.is_admin);

        session.apply(SessionEvent::SignedOut);
        assert!(!session.is_admin);
    }

    #[test]
    fn test_admin_is_independent_of_identity() {
        let mut session = Session::default();
        session.apply(SessionEvent::AdminGranted);
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: None,
        });

        assert!(session.is_admin);
    }

    #[test]
    fn test_vendor_created_requires_matching_user() {
        let mut anonymous = Session::default();
        anonymous.apply(SessionEvent::VendorCreated(vendor("u1", false)));
        assert_eq!(anonymous, Session::default());

        let mut session = signed_in("u1");
        session.apply(SessionEvent::VendorCreated(vendor("u2", false)));
        assert!(session.vendor.is_none());

        session.apply(SessionEvent::VendorCreated(vendor("u1", false)));
        assert_eq!(session.phase(), SessionPhase::VendorPending);
    }

    #[test]
    fn test_profile_updated_merges_only_given_fields() {
        let mut session = signed_in("u1");
        session.apply(SessionEvent::ProfileUpdated {
            user_id: "u1".to_string(),
            update: ProfileUpdate {
                phone: Some("0803 000 0000".to_string()),
                ..Default::default()
            },
        });

        let user = session.user.unwrap();
        assert_eq!(user.phone.as_deref(), Some("0803 000 0000"));
        assert_eq!(user.full_name, "Chidi Eze");
        assert_eq!(user.email, "u1@example.com");
    }

    #[test]
    fn test_profile_update_for_previous_user_is_ignored() {
        let mut session = signed_in("u2");
        session.apply(SessionEvent::ProfileUpdated {
            user_id: "u1".to_string(),
            update: ProfileUpdate {
                full_name: Some("Other".to_string()),
                ..Default::default()
            },
        });

        assert_eq!(session.user.unwrap().full_name, "Chidi Eze");
    }

    #[test]
    fn test_last_enqueued_event_wins() {
        // Sign-out pushed by the provider lands after an in-flight profile
        // load completes: the session ends anonymous.
        let mut session = Session::default();
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: None,
        });
        session.apply(SessionEvent::SignedOut);
        assert!(session.user.is_none());

        // Reverse order: the profile load wins.
        let mut session = Session::default();
        session.apply(SessionEvent::SignedOut);
        session.apply(SessionEvent::ProfileLoaded {
            user: user("u1"),
            vendor: None,
        });
        assert!(session.user.is_some());
    }

    #[test]
    fn test_loading_and_initialized_flags() {
        let mut session = Session::default();
        session.apply(SessionEvent::LoadingStarted);
        assert!(session.loading);
        session.apply(SessionEvent::LoadingFinished);
        assert!(!session.loading);

        session.apply(SessionEvent::Initialized);
        assert!(session.initialized);
    }

    #[test]
    fn test_restored_keeps_only_admin_flag() {
        let session = Session::restored(&PersistedSession::new(true));
        assert!(session.is_admin);
        assert!(session.user.is_none());
        assert!(session.vendor.is_none());
        assert!(!session.initialized);
        assert_eq!(session.persisted(), PersistedSession::new(true));
    }
}
