//! # Repository Module
//!
//! Database repository implementations for the dispensary.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clinic-desk command                                                   │
//! │       │                                                                 │
//! │       │  db.inventory().search("dolo", 20)                             │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── search(&self, query, limit)                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, medicine)                                           │
//! │  └── update(&self, id, changes)                                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`](inventory::InventoryRepository) - Medicine lots
//! - [`LedgerRepository`](ledger::LedgerRepository) - Bills and prescriptions
//! - [`PatientRepository`](patient::PatientRepository) - Patients by phone
//! - [`AvailabilityRepository`](availability::AvailabilityRepository) - Doctor status

pub mod availability;
pub mod inventory;
pub mod ledger;
pub mod patient;
