//! # Bazaar Storefront Library
//!
//! Startup and wiring for the console storefront.
//!
//! ## Module Organization
//! ```text
//! bazaar_storefront/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── shell.rs        ◄─── Line-oriented command dispatcher
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState + state type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── session.rs  ◄─── SessionStore wrapper + console notifier
//! │   ├── cart.rs     ◄─── Cart state management
//! │   └── config.rs   ◄─── Store settings
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── auth.rs     ◄─── Sign up/in/out, OAuth, recovery, profile
//! │   ├── catalog.rs  ◄─── Product search and lookup
//! │   ├── cart.rs     ◄─── Cart manipulation
//! │   ├── orders.rs   ◄─── Checkout, payment, order history
//! │   ├── vendor.rs   ◄─── Vendor dashboard
//! │   ├── admin.rs    ◄─── Admin dashboard
//! │   └── config.rs   ◄─── Store settings retrieval
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management (Multiple State Types)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌────────────┐  ┌────────────────┐  ┌────────────┐  ┌──────────────┐  │
//! │  │  DbState   │  │  SessionState  │  │ CartState  │  │ ConfigState  │  │
//! │  │            │  │                │  │            │  │              │  │
//! │  │ • SQLite   │  │ • SessionStore │  │ • Cart     │  │ • Store name │  │
//! │  │   pool     │  │ • user/vendor  │  │   (Mutex)  │  │ • Pricing    │  │
//! │  │            │  │ • is_admin     │  │            │  │   rules      │  │
//! │  └────────────┘  └────────────────┘  └────────────┘  └──────────────┘  │
//! │                                                                         │
//! │  Each command takes only the state it needs.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod shell;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use bazaar_db::{Database, DbConfig};
use bazaar_session::{FileSessionStorage, StorefrontConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shell::Shell;
use state::{AppState, ConsoleNotifier};

/// Runs the console storefront until stdin closes or `quit` is entered.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • defaults < storefront.toml < BAZAAR_* environment                 │
/// │                                                                         │
/// │  3. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │                                                                         │
/// │  4. Initialize State Objects ─────────────────────────────────────────► │
/// │     • SessionState restores is_admin from session.json                  │
/// │     • CartState starts empty                                            │
/// │                                                                         │
/// │  5. Initialize Session Store ─────────────────────────────────────────► │
/// │     • Loads the provider session, follows pushed auth events            │
/// │                                                                         │
/// │  6. Run Shell ────────────────────────────────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Bazaar Storefront");

    let config = StorefrontConfig::load(None).context("loading storefront config")?;

    let db = Database::new(DbConfig::new(&config.data.db_path))
        .await
        .context("opening storefront database")?;
    info!(path = %config.data.db_path.display(), "Database connected and migrations applied");

    let state = AppState::new(
        db.clone(),
        &config,
        Arc::new(FileSessionStorage::new(&config.data.session_path)),
        Arc::new(ConsoleNotifier),
    );
    info!("State initialized");

    state
        .session
        .inner()
        .initialize()
        .await
        .context("initializing session store")?;

    let shell = Shell::new(state);
    shell.run_stdin().await.context("reading shell input")?;

    db.close().await;
    info!("Storefront stopped");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=bazaar_session=trace` - Trace the session store only
/// - Default: `info,bazaar=debug,sqlx=warn`
///
/// Logs go to stderr so they don't interleave with shell output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bazaar=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
