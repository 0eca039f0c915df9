//! # bazaar-db: Database Layer for the Bazaar Storefront
//!
//! SQLite storage for everything the hosted backend owns: user and vendor
//! profile rows, the catalog, orders, store settings, and the auth
//! provider's accounts, sessions and recovery tokens.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  bazaar-session (LocalBackend)     apps/storefront (commands)           │
//! │            │                                │                           │
//! │            └──────────────┬─────────────────┘                           │
//! │                           ▼                                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                ★ bazaar-db (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   Database ──► users() vendors() products() orders()           │   │
//! │  │                settings() accounts()                            │   │
//! │  │                                                                 │   │
//! │  │   Each accessor hands out a repository over a pool clone.       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                ▼                                        │
//! │                     SQLite (file or :memory:)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("bazaar.db")).await?;
//! let scarves = db.products().search("scarf", 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::account::{AccountRepository, AuthAccount, AuthSessionRecord};
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::settings::SettingsRepository;
pub use repository::user::UserRepository;
pub use repository::vendor::VendorRepository;
