//! # Commands Module
//!
//! All commands exposed to the UI.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs           ◄─── You are here (exports)
//! ├── inventory.rs     ◄─── Medicine list, search, add, edit, stock adjust
//! ├── cart.rs          ◄─── Prescription cart manipulation and preview
//! ├── prescription.rs  ◄─── Finalize: commit + share message
//! ├── patient.rs       ◄─── Patient lookup and history
//! ├── billing.rs       ◄─── Bill history and dashboard figures
//! ├── availability.rs  ◄─── Doctor available/offline toggle
//! └── config.rs        ◄─── Configuration retrieval
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI                                                                     │
//! │  ──                                                                     │
//! │  search_inventory(&db, &config, "dolo", Some(20))                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  pub async fn search_inventory(                                         │
//! │      db: &DbState,          ◄── Only the state it needs                 │
//! │      config: &ConfigState,                                              │
//! │      query: String,         ◄── From the UI                             │
//! │      limit: Option<u32>,    ◄── Optional param                          │
//! │  ) -> Result<Vec<MedicineDto>, ApiError>                                │
//! │         │                                                               │
//! │         │ (serde, camelCase)                                            │
//! │         ▼                                                               │
//! │  UI receives: MedicineDto[] or { code, message }                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod availability;
pub mod billing;
pub mod cart;
pub mod config;
pub mod inventory;
pub mod patient;
pub mod prescription;
