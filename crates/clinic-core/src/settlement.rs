//! # Settlement Calculator
//!
//! Computes the financial summary of a dispense event.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart lines                                                             │
//! │  ┌──────────────────────────────┐                                       │
//! │  │ Dolo 650   ×2  sell ₹10 cost ₹6 │──► subtotal ₹20   profit ₹8        │
//! │  │ Dolo 650   ×1  sell ₹12 cost ₹6 │──► subtotal ₹12   profit ₹6        │
//! │  └──────────────────────────────┘                                       │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │  Settlement { items (input order), bill_total ₹32, profit ₹14 }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure and deterministic: the doctor panel calls it for every preview and the
//! ledger writer calls it once more at commit. Lines sold below cost contribute
//! negative profit; that is a valid outcome, not an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{BillItem, DispenseLine, PrescriptionItem};

/// Bill items plus aggregate totals for one cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    /// One item per input line, same order.
    pub items: Vec<BillItem>,
    /// Σ quantity × selling price.
    pub bill_total: Money,
    /// Σ quantity × (selling price − cost price).
    pub profit: Money,
}

impl Settlement {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Computes bill items, bill total and profit for `lines`.
///
/// An empty cart settles to zero with no items.
///
/// ```rust
/// use clinic_core::settlement::compute_settlement;
/// use clinic_core::DispenseLine;
///
/// let lines = vec![
///     DispenseLine::new("m1", "Dolo 650", 2, 600, 1000),
///     DispenseLine::new("m1", "Dolo 650", 1, 600, 1200),
/// ];
/// let s = compute_settlement(&lines);
/// assert_eq!(s.bill_total.paise(), 3200);
/// assert_eq!(s.profit.paise(), 1400);
/// ```
pub fn compute_settlement(lines: &[DispenseLine]) -> Settlement {
    let items: Vec<BillItem> = lines.iter().map(bill_item).collect();
    let bill_total = items.iter().map(BillItem::total).sum();
    let profit = lines.iter().map(DispenseLine::profit).sum();

    Settlement {
        items,
        bill_total,
        profit,
    }
}

/// Snapshot of one line as it appears on the bill.
pub fn bill_item(line: &DispenseLine) -> BillItem {
    BillItem {
        lot_id: line.lot_id.clone(),
        name: line.name.clone(),
        quantity: line.quantity,
        cost_price_paise: line.cost_price_paise,
        selling_price_paise: line.selling_price_paise,
        total_paise: line.subtotal().paise(),
    }
}

/// Prescription lines: the bill snapshot with dosage metadata attached.
pub fn prescription_items(lines: &[DispenseLine]) -> Vec<PrescriptionItem> {
    lines
        .iter()
        .map(|line| PrescriptionItem {
            lot_id: line.lot_id.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            cost_price_paise: line.cost_price_paise,
            selling_price_paise: line.selling_price_paise,
            total_paise: line.subtotal().paise(),
            timings: line.timings.clone(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
