//! # Persisted Session Slice
//!
//! The part of [`Session`](crate::session::Session) that survives a restart,
//! and its on-disk encoding.
//!
//! ## Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  version 1 (written by this crate)                                      │
//! │    {"version":1,"is_admin":true}                                        │
//! │                                                                         │
//! │  version 0 (legacy web client wrapper, read only)                      │
//! │    {"state":{"isAdmin":true},"version":0}                               │
//! │                                                                         │
//! │  decode(bytes) ──► Legacy? ──► migrate to v1                           │
//! │                └─► Current? ─► version check                           │
//! │                └─► neither ──► PersistError::Malformed                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::PersistError;

/// Version written by [`PersistedSession::encode`].
pub const CURRENT_VERSION: u32 = 1;

/// Version of the legacy wrapper shape.
const LEGACY_VERSION: u32 = 0;

// =============================================================================
// Persisted Session
// =============================================================================

/// The persisted slice: only the admin flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PersistedSession {
    pub version: u32,
    pub is_admin: bool,
}

impl Default for PersistedSession {
    fn default() -> Self {
        PersistedSession::new(false)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredShape {
    Legacy {
        state: LegacyState,
        version: u32,
    },
    Current {
        version: u32,
        #[serde(default)]
        is_admin: bool,
    },
}

#[derive(Deserialize)]
struct LegacyState {
    #[serde(rename = "isAdmin", default)]
    is_admin: bool,
}

impl PersistedSession {
    pub fn new(is_admin: bool) -> Self {
        PersistedSession {
            version: CURRENT_VERSION,
            is_admin,
        }
    }

    /// Encodes as the current version.
    pub fn encode(&self) -> Result<Vec<u8>, PersistError> {
        let current = PersistedSession::new(self.is_admin);
        Ok(serde_json::to_vec_pretty(&current)?)
    }

    /// Decodes any known version, migrating older shapes forward.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::persist::PersistedSession;
    ///
    /// let legacy = br#"{"state":{"isAdmin":true},"version":0}"#;
    /// let session = PersistedSession::decode(legacy).unwrap();
    /// assert!(session.is_admin);
    /// assert_eq!(session.version, 1);
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        match serde_json::from_slice::<StoredShape>(bytes)? {
            StoredShape::Legacy { state, version } if version == LEGACY_VERSION => {
                Ok(PersistedSession::new(state.is_admin))
            }
            StoredShape::Legacy { version, .. } => Err(PersistError::UnsupportedVersion(version)),
            StoredShape::Current { version, is_admin } if version == CURRENT_VERSION => {
                Ok(PersistedSession::new(is_admin))
            }
            StoredShape::Current { version, .. } => Err(PersistError::UnsupportedVersion(version)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
