//! # Clinic Desk Library
//!
//! Application shell for the clinic dispensary: state objects and the
//! command functions the UI calls.
//!
//! ## Module Organization
//! ```text
//! clinic_desk_lib/
//! ├── lib.rs              ◄─── You are here (startup & Shell)
//! ├── state/
//! │   ├── mod.rs          ◄─── State type exports
//! │   ├── db.rs           ◄─── Database state wrapper
//! │   ├── cart.rs         ◄─── Prescription cart
//! │   ├── config.rs       ◄─── Clinic configuration
//! │   └── availability.rs ◄─── Availability observable
//! ├── commands/           ◄─── One file per screen
//! └── error.rs            ◄─── API error type for commands
//! ```
//!
//! ## State Management
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shell                                                                  │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌──────────────────────┐ │
//! │  │  DbState   │ │ CartState  │ │ConfigState │ │  AvailabilityState   │ │
//! │  │            │ │            │ │            │ │                      │ │
//! │  │  • Pool    │ │  • Lines   │ │  • Clinic  │ │  • Latest status     │ │
//! │  │  • Repos   │ │  • Totals  │ │  • Doctor  │ │  • Subscribers       │ │
//! │  │  • Writer  │ │            │ │  • Country │ │                      │ │
//! │  └────────────┘ └────────────┘ └────────────┘ └──────────────────────┘ │
//! │                                                                         │
//! │  Each command takes only the state it needs.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ApiError;
use crate::state::{AvailabilityState, CartState, ConfigState, DbState};
use clinic_db::{Database, DbConfig, DbError};

/// Why the shell could not start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Startup query failed: {0}")]
    Command(#[from] ApiError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// All shell state, created once at startup.
#[derive(Debug)]
pub struct Shell {
    pub db: DbState,
    pub cart: CartState,
    pub config: ConfigState,
    pub availability: AvailabilityState,
}

impl Shell {
    /// Connects to the database and builds every state object.
    ///
    /// The availability observable starts from the stored record.
    pub async fn open(db_config: DbConfig, config: ConfigState) -> Result<Shell, StartupError> {
        let db = Database::new(db_config).await?;
        info!("Database connected and migrations applied");

        let stored = db.availability().get().await?;

        Ok(Shell {
            db: DbState::new(db),
            cart: CartState::new(),
            config,
            availability: AvailabilityState::new(stored),
        })
    }

    pub async fn close(&self) {
        self.db.inner().close().await;
    }
}

/// Runs the shell.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging                                                  │
/// │     • tracing-subscriber with env filter (RUST_LOG)                     │
/// │                                                                         │
/// │  2. Determine Database Path                                             │
/// │     • CLINIC_DB_PATH, else the platform data directory                  │
/// │                                                                         │
/// │  3. Open Shell                                                          │
/// │     • SQLite with WAL mode, pending migrations                          │
/// │     • DbState, CartState, ConfigState::from_env, AvailabilityState      │
/// │                                                                         │
/// │  4. Report                                                              │
/// │     • Dashboard figures as JSON on stdout                               │
/// │     • Low-stock lots as warnings                                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    info!("Starting clinic dispensary shell");

    let db_path = database_path()?;
    info!(?db_path, "Database path determined");

    let shell = Shell::open(DbConfig::new(db_path), ConfigState::from_env()).await?;
    info!(
        clinic = %shell.config.clinic_name,
        online = shell.availability.current().online,
        "State initialized"
    );

    let stats = commands::billing::dashboard_stats(&shell.db).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    for lot in commands::inventory::low_stock(&shell.db, &shell.config).await? {
        warn!(name = %lot.name, quantity = lot.quantity, "Low stock");
    }

    shell.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=clinic=trace` - Show trace for clinic crates only
/// - Default: INFO, DEBUG for clinic crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,clinic=debug,sqlx=warn"));

    // Ignore the error if a subscriber is already installed (tests).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.clinic.dispensary/clinic.db`
/// - **Windows**: `%APPDATA%\clinic\dispensary\data\clinic.db`
/// - **Linux**: `~/.local/share/dispensary/clinic.db`
///
/// ## Development Override
/// Set `CLINIC_DB_PATH` to use a custom path.
fn database_path() -> Result<PathBuf, StartupError> {
    if let Ok(path) = std::env::var("CLINIC_DB_PATH") {
        return Ok(PathBuf::from(path));
    }

    let proj_dirs =
        ProjectDirs::from("com", "clinic", "dispensary").ok_or(StartupError::NoDataDir)?;
    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("clinic.db"))
}
