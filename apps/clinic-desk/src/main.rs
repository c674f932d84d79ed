//! # Clinic Desk Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Clinic Dispensary                                │
//! │                                                                         │
//! │  main.rs ────► tokio runtime, exit code                                 │
//! │                                                                         │
//! │  lib.rs ─────► logging, database path, Shell, startup report            │
//! │                                                                         │
//! │  commands/ ──► search_inventory, add_to_cart, finalize_prescription     │
//! │                                                                         │
//! │  state/ ─────► DbState, CartState, ConfigState, AvailabilityState       │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  SQLite: clinic.db (local file, WAL mode)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // The actual setup is in lib.rs for testability
    match clinic_desk_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("clinic-desk: {}", e);
            ExitCode::FAILURE
        }
    }
}
