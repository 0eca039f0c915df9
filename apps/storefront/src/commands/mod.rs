//! # Storefront Commands
//!
//! Every operation the shell can run. Each is a plain function taking the
//! state it needs and returning `ApiResult<T>`.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── auth.rs     ◄─── Sign up/in/out, OAuth, recovery, profile, vendor apply
//! ├── catalog.rs  ◄─── Product search and lookup
//! ├── cart.rs     ◄─── Cart manipulation
//! ├── orders.rs   ◄─── Checkout, payment, order history
//! ├── vendor.rs   ◄─── Vendor dashboard (approved vendors only)
//! ├── admin.rs    ◄─── Admin dashboard (is_admin only)
//! └── config.rs   ◄─── Store settings retrieval
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shell line:  add 3f2a... 2                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  commands::cart::add_to_cart(                                           │
//! │      &state.db,       ◄── only the state it needs                       │
//! │      &state.cart,                                                       │
//! │      &state.config,                                                     │
//! │      "3f2a...", Some(2),                                                │
//! │  ) -> ApiResult<CartResponse>                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Shell renders CartResponse, or "✗ <ApiError message>"                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Commands that act as the signed-in user read identity from
//! `SessionState`; they never trust an id passed on the command line.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod vendor;
