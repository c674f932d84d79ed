//! # clinic-db: Database Layer for the Clinic Dispensary
//!
//! This crate provides database access for the dispensary.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dispensary Data Flow                             │
//! │                                                                         │
//! │  clinic-desk command (finalize_prescription)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     clinic-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │   │  inventory     │   │  (embedded)  │    │   │
//! │  │   │               │◄──│  ledger        │   │ 001_initial  │    │   │
//! │  │   │  SqlitePool   │   │  patient       │   │              │    │   │
//! │  │   └───────┬───────┘   │  availability  │   └──────────────┘    │   │
//! │  │           │           └────────────────┘                       │   │
//! │  │           ▼                                                    │   │
//! │  │   ┌────────────────────────────────────┐                       │   │
//! │  │   │  LedgerWriter (dispense.rs)        │                       │   │
//! │  │   │  prescription → bill → stock, 1 tx │                       │   │
//! │  │   └────────────────────────────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (platform data dir or CLINIC_DB_PATH)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and dispense error types
//! - [`repository`] - Repository implementations
//! - [`dispense`] - Atomic dispense commit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinic_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/clinic.db")).await?;
//!
//! let bill = db.dispenser().commit_dispense("9876543210", &lines).await?;
//! let history = db.ledger().bills_for_patient("9876543210").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dispense;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use dispense::{DispensePreview, LedgerWriter, MAX_COMMIT_ATTEMPTS};
pub use error::{CommitStage, DbError, DbResult, DispenseError, DispenseResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::availability::AvailabilityRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::patient::PatientRepository;
