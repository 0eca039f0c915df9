//! # Notices
//!
//! User-facing messages produced by session operations ("Signed in
//! successfully", "Invalid login credentials"). How they are shown is up to
//! the client; the store only emits them.

use std::fmt;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Success => write!(f, "✓ {}", self.message),
            NoticeLevel::Error => write!(f, "✗ {}", self.message),
        }
    }
}

/// Trait for surfacing notices to the user.
///
/// Implemented by the client; the store calls it after every operation.
pub trait SessionNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// No-op notifier for testing and headless use.
pub struct NoOpNotifier;

impl SessionNotifier for NoOpNotifier {
    fn notify(&self, _notice: Notice) {}
}
