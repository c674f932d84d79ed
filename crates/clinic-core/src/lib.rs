//! # clinic-core: Pure Business Logic for the Clinic Dispensary
//!
//! This crate is the **heart** of the dispensary. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Clinic Dispensary Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Client (doctor panel)                    │   │
//! │  │   Inventory ──► Prescription Cart ──► Finalize ──► Bill list    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 clinic-desk (application shell)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ clinic-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ settlement │  │ reconcile │  │   stats   │  │   │
//! │  │   │ Lot, Bill │  │ total,     │  │ stock     │  │ today /   │  │   │
//! │  │   │ Line      │  │ profit     │  │ netting   │  │ month     │  │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    clinic-db (Database Layer)                   │   │
//! │  │          SQLite repositories, atomic dispense commit            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MedicineLot, DispenseLine, Bill, Prescription)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`settlement`] - Bill total and profit from a cart
//! - [`reconcile`] - Post-dispense stock computation with netting
//! - [`stats`] - Dashboard date buckets
//! - [`share`] - Prescription message and messaging deep link
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use clinic_core::settlement::compute_settlement;
//! use clinic_core::{DispenseLine, Money};
//!
//! let lines = vec![DispenseLine::new("m1", "Dolo 650", 3, 500, 800)];
//! let settlement = compute_settlement(&lines);
//!
//! assert_eq!(settlement.bill_total, Money::from_paise(2400));
//! assert_eq!(settlement.profit, Money::from_paise(900));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reconcile;
pub mod settlement;
pub mod share;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconcile::StockAdjustment;
pub use settlement::Settlement;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single prescription cart.
pub const MAX_CART_LINES: usize = 50;

/// Maximum quantity of a single medicine on one line.
///
/// ## Business Reason
/// Prevents accidental over-dispensing (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Highest unit price accepted, in paise (₹1,00,00,000).
///
/// A full cart at this price and [`MAX_LINE_QUANTITY`] still totals well
/// inside `i64`, so settlement arithmetic never overflows.
pub const MAX_PRICE_PAISE: i64 = 1_000_000_000;

/// Stock level below which a lot is flagged as running low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
