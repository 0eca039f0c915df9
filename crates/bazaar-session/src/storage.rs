//! # Session Storage
//!
//! Durable home of the persisted session slice (the admin flag).
//!
//! ## File Format
//! ```json
//! {
//!   "version": 1,
//!   "is_admin": true
//! }
//! ```
//! Files written by older clients (`{"state":{"isAdmin":true},"version":0}`)
//! are read through [`PersistedSession::decode`] and rewritten in the current
//! shape on the next save.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bazaar_core::PersistedSession;
use tracing::debug;

use crate::error::StorageError;

/// Reads and writes the persisted slice.
///
/// Both methods are synchronous and may block. `load` runs once in
/// `SessionStore::new`; `save` is run on tokio's blocking pool, awaited by
/// the reducer so writes land in event order.
pub trait SessionStorage: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedSession>, StorageError>;

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;
}

// =============================================================================
// File Storage
// =============================================================================

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No persisted session");
            return Ok(None);
        }

        let bytes = std::fs::read(&self.path)?;
        Ok(Some(PersistedSession::decode(&bytes)?))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, session.encode()?)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = ?self.path, is_admin = session.is_admin, "Persisted session saved");
        Ok(())
    }
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-process storage. Share one through an `Arc` to simulate a restart
/// against the same slot.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<PersistedSession>>,
    saves: Mutex<usize>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `session`.
    pub fn with(session: PersistedSession) -> Self {
        MemorySessionStorage {
            slot: Mutex::new(Some(session)),
            saves: Mutex::new(0),
        }
    }

    /// What is currently stored.
    pub fn stored(&self) -> Option<PersistedSession> {
        self.slot.lock().map(|slot| *slot).unwrap_or(None)
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        Ok(self.stored())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(*session);
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
