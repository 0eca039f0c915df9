//! # Bazaar Storefront Entry Point
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Storefront                                │
//! │                                                                         │
//! │  stdin ──► Shell ──► commands/ ──┬──► SessionStore ──► LocalBackend    │
//! │                                  │                         │            │
//! │                                  └──► Database ◄───────────┘            │
//! │                                        (bazaar.db, WAL)                 │
//! │                                                                         │
//! │  stdout ◄── rendered results + session notices                          │
//! │  stderr ◄── tracing                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing
//! 2. Load `storefront.toml` + environment overrides
//! 3. Connect to the database & run migrations
//! 4. Build state (session store restores the persisted admin flag)
//! 5. Initialize the session store
//! 6. Read commands until EOF or `quit`

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The actual setup is in lib.rs for better testability
    bazaar_storefront::run().await
}
