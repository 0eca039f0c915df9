//! # bazaar-session: Session Store for the Bazaar Storefront
//!
//! Owns the identity of the running client: the signed-in user, their vendor
//! row, and the admin flag.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Architecture                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   SessionStore<B: Backend>                       │  │
//! │  │                                                                  │  │
//! │  │  Imperative ops ──┐                                              │  │
//! │  │                   ├──► mpsc queue ──► Session::apply ──► watch   │  │
//! │  │  Pushed events  ──┘                        │                     │  │
//! │  │                                            ▼                     │  │
//! │  │                                  SessionStorage (is_admin)       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │               ┌───────────────┴──────────────┐                         │
//! │               ▼                              ▼                          │
//! │  ┌────────────────────────┐     ┌─────────────────────────────┐        │
//! │  │  AuthApi               │     │  ProfileApi                 │        │
//! │  │  sign up/in/out, OAuth │     │  users / vendors rows,      │        │
//! │  │  recovery, AuthEvents  │     │  admin password setting     │        │
//! │  └───────────┬────────────┘     └──────────────┬──────────────┘        │
//! │              └──────────────┬──────────────────┘                        │
//! │                             ▼                                           │
//! │               LocalBackend (argon2 + JWT + bazaar-db)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`backend`] - `AuthApi` / `ProfileApi` traits
//! - [`config`] - `storefront.toml` loading
//! - [`error`] - Backend, session, storage and config errors
//! - [`local`] - SQLite-backed implementation of the backend traits
//! - [`notice`] - User-facing notices
//! - [`storage`] - Persisted session slice
//! - [`store`] - The `SessionStore`
//! - [`token`] - Access token signing

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
pub mod notice;
pub mod storage;
pub mod store;
pub mod token;

pub use backend::{AuthApi, Backend, ProfileApi};
pub use config::{AuthSettings, DataSettings, StoreSettings, StorefrontConfig};
pub use error::{
    BackendError, BackendResult, ConfigError, SessionError, SessionResult, StorageError,
};
pub use local::{LocalBackend, RecoveryEmail};
pub use notice::{NoOpNotifier, Notice, NoticeLevel, SessionNotifier};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};
pub use store::SessionStore;
pub use token::TokenIssuer;
