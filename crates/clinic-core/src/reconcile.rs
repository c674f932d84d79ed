//! # Inventory Reconciler
//!
//! Computes post-dispense stock for every lot a cart touches.
//!
//! ## Netting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Lot m1: quantity 5                                                     │
//! │                                                                         │
//! │  Cart: [m1 ×3, m2 ×1, m1 ×4]                                            │
//! │           │                                                             │
//! │           ▼  sum per lot, first-seen order                              │
//! │  Net:  [m1 ×7, m2 ×1]                                                   │
//! │           │                                                             │
//! │           ▼  check against stock                                        │
//! │  m1: 5 - 7 < 0  →  InsufficientStock { requested: 7 }                   │
//! │                                                                         │
//! │  Checking each line alone (3 ≤ 5, 4 ≤ 5) would wrongly pass.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The result is all-or-nothing: a single short lot fails the whole cart and
//! no adjustment is returned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{DispenseLine, MedicineLot};

/// The stock change for one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub lot_id: String,
    /// Stock read before the dispense. The ledger writer updates only if
    /// the stored value still equals this.
    pub previous_quantity: i64,
    /// Netted units taken from the lot.
    pub dispensed: i64,
    pub new_quantity: i64,
}

/// Sums line quantities per lot, keeping the order lots first appear in.
pub fn net_quantities(lines: &[DispenseLine]) -> Vec<(String, i64)> {
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for line in lines {
        match index.get(line.lot_id.as_str()) {
            Some(&i) => order[i].1 += line.quantity,
            None => {
                index.insert(line.lot_id.as_str(), order.len());
                order.push((line.lot_id.clone(), line.quantity));
            }
        }
    }

    order
}

/// Validates stock for every lot in `lines` and computes new quantities.
///
/// `lots` must hold the current state of each referenced lot; extra lots are
/// ignored.
///
/// ## Errors
/// - [`CoreError::LotNotFound`] when a line references a lot not in `lots`
/// - [`CoreError::InsufficientStock`] for the first lot (in cart order) whose
///   netted quantity exceeds its stock
pub fn reconcile(lines: &[DispenseLine], lots: &[MedicineLot]) -> CoreResult<Vec<StockAdjustment>> {
    let by_id: HashMap<&str, &MedicineLot> = lots.iter().map(|l| (l.id.as_str(), l)).collect();

    net_quantities(lines)
        .into_iter()
        .map(|(lot_id, requested)| {
            let lot = by_id
                .get(lot_id.as_str())
                .ok_or_else(|| CoreError::LotNotFound(lot_id.clone()))?;

            let new_quantity = lot.quantity - requested;
            if new_quantity < 0 {
                return Err(CoreError::InsufficientStock {
                    lot_id,
                    name: lot.name.clone(),
                    available: lot.quantity,
                    requested,
                });
            }

            Ok(StockAdjustment {
                lot_id,
                previous_quantity: lot.quantity,
                dispensed: requested,
                new_quantity,
            })
        })
        .collect()
}

/// Applies a manual stock correction (`+` restock, `-` write-off).
///
/// Returns the new quantity, or [`CoreError::NegativeStock`] if it would go
/// below zero.
pub fn apply_delta(lot: &MedicineLot, delta: i64) -> CoreResult<i64> {
    let new_quantity = lot.quantity.checked_add(delta).ok_or_else(|| {
        ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        }
    })?;
    if new_quantity < 0 {
        return Err(CoreError::NegativeStock {
            lot_id: lot.id.clone(),
            current: lot.quantity,
            delta,
        });
    }
    Ok(new_quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================
