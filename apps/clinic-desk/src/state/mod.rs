//! # State Module
//!
//! Application state for the dispensary shell.
//!
//! Each command takes only the state objects it needs instead of one big
//! `AppState`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌────────────────┐ │
//! │  │   DbState    │ │  CartState   │ │ ConfigState  │ │ Availability-  │ │
//! │  │              │ │              │ │              │ │ State          │ │
//! │  │  Database    │ │  Arc<Mutex<  │ │  clinic name │ │                │ │
//! │  │  (SQLite     │ │    Cart      │ │  doctor      │ │  watch::Sender │ │
//! │  │   pool)      │ │  >>          │ │  threshold   │ │  <Availability>│ │
//! │  └──────────────┘ └──────────────┘ └──────────────┘ └────────────────┘ │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • CartState: Protected by Arc<Mutex<T>> for exclusive access          │
//! │  • ConfigState: Read-only after initialization                         │
//! │  • AvailabilityState: watch channel, many readers, latest value wins   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod availability;
mod cart;
mod config;
mod db;

pub use availability::AvailabilityState;
pub use cart::{Cart, CartState};
pub use config::ConfigState;
pub use db::DbState;
