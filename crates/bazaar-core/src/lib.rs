//! # bazaar-core: Pure Business Logic for the Bazaar Storefront
//!
//! This crate holds every piece of storefront logic that can be expressed
//! without I/O: the domain types mirrored from the hosted database, money and
//! cart math, input validation, and the session reducer that the session
//! store drives.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bazaar Storefront Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront client (apps/storefront)             │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Vendor / Admin dashboards  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        bazaar-session (SessionStore, auth backend traits)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │  session  │  │   │
//! │  │   │ Profiles  │  │   Money   │  │   Cart    │  │  reducer  │  │   │
//! │  │   │ Products  │  │  TaxRate  │  │ CartItem  │  │  persist  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (profiles, products, orders, auth shapes)
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - Shopping cart with frozen prices and totals
//! - [`session`] - Session state and its reducer
//! - [`persist`] - Versioned on-disk shape of the persisted session slice
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::session::{Session, SessionEvent};
//!
//! let mut session = Session::default();
//! session.apply(SessionEvent::AdminGranted);
//! assert!(session.is_admin);
//!
//! session.apply(SessionEvent::SignedOut);
//! assert!(!session.is_admin);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod persist;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartTotals, PricingRules};
pub use error::{CoreError, PersistError, ValidationError};
pub use money::Money;
pub use persist::PersistedSession;
pub use session::{Session, SessionEvent, SessionPhase};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest price a product may be listed at, in cents ($1,000,000.00).
///
/// At this ceiling a full cart (`MAX_CART_ITEMS` lines of `MAX_ITEM_QUANTITY`)
/// totals about 10^13 cents, well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Minimum password length accepted by sign-up and password reset.
///
/// Matches the hosted auth provider's default policy.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Settings key under which the admin password is stored.
pub const ADMIN_PASSWORD_KEY: &str = "admin_password";
