//! # Cart State
//!
//! The prescription being built for the patient in front of the doctor.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Prescription Cart Operations                         │
//! │                                                                         │
//! │  Doctor Action            Command                 Cart State Change     │
//! │  ─────────────            ───────                 ─────────────────     │
//! │                                                                         │
//! │  Pick medicine ──────────► add_to_cart() ───────► lines.push(line)     │
//! │  (qty, price, timings)                                                  │
//! │                                                                         │
//! │  Click ✕ on a row ───────► remove_from_cart() ──► lines.remove(i)      │
//! │                                                                         │
//! │  Click Clear ────────────► clear_cart() ────────► lines.clear()        │
//! │                                                                         │
//! │  View Cart ──────────────► get_cart() ──────────► (read only)          │
//! │                                                                         │
//! │  Finalize ───────────────► finalize_prescription() ──► clear on Ok     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are not merged: the same lot may appear twice (e.g. at two prices).
//! Stock is netted per lot when checking and when committing.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use clinic_core::settlement::{compute_settlement, Settlement};
use clinic_core::validation::{validate_cart_size, validate_price_paise, validate_quantity};
use clinic_core::{DispenseLine, DoseTiming, MedicineLot, Money};
use serde::{Deserialize, Serialize};

/// The prescription cart.
///
/// ## Invariants
/// - Every line has a positive quantity no larger than `MAX_LINE_QUANTITY`
/// - At most `MAX_CART_LINES` lines
/// - Units requested per lot never exceed that lot's stock when it was added
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub lines: Vec<DispenseLine>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a line for `lot`.
    ///
    /// `selling_price` overrides the lot's price for this line only.
    /// Rejected when the lot (counting lines already in the cart) does not
    /// have `quantity` more units.
    pub fn add_line(
        &mut self,
        lot: &MedicineLot,
        quantity: i64,
        selling_price: Option<Money>,
        timings: Vec<DoseTiming>,
    ) -> Result<(), String> {
        validate_quantity(quantity).map_err(|e| e.to_string())?;
        validate_cart_size(self.lines.len()).map_err(|e| e.to_string())?;

        if let Some(price) = selling_price {
            validate_price_paise("selling price", price.paise()).map_err(|e| e.to_string())?;
        }

        let in_cart = self.units_for(&lot.id);
        if in_cart + quantity > lot.quantity {
            return Err(format!(
                "Only {} units of {} in stock ({} already in cart)",
                lot.quantity, lot.name, in_cart
            ));
        }

        self.lines
            .push(DispenseLine::from_lot(lot, quantity, selling_price).with_timings(timings));
        Ok(())
    }

    /// Removes the line at `index` and returns it.
    pub fn remove_line(&mut self, index: usize) -> Result<DispenseLine, String> {
        if index >= self.lines.len() {
            return Err(format!(
                "No line {} in cart ({} lines)",
                index,
                self.lines.len()
            ));
        }
        Ok(self.lines.remove(index))
    }

    /// Removes the lines of a committed snapshot, keeping anything added
    /// after the snapshot was taken. The cart restarts once it is empty.
    pub fn remove_committed(&mut self, committed: &[DispenseLine]) {
        for line in committed {
            if let Some(pos) = self.lines.iter().position(|l| l == line) {
                self.lines.remove(pos);
            }
        }
        if self.lines.is_empty() {
            self.created_at = Utc::now();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    /// Units of `lot_id` across all lines.
    pub fn units_for(&self, lot_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.lot_id == lot_id)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn settlement(&self) -> Settlement {
        compute_settlement(&self.lines)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

/// Shell-held cart state.
///
/// `Arc<Mutex<Cart>>`: one writer at a time; locks are held only for the
/// duration of a closure, never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState::default()
    }

    /// Executes a function with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|cart| cart.add_line(&lot, 2, None, vec![]))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    /// Copy of the current lines.
    pub fn snapshot(&self) -> Vec<DispenseLine> {
        self.with_cart(|c| c.lines.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{DoseSlot, MAX_PRICE_PAISE};

    fn lot(id: &str, quantity: i64, cost: i64, sell: i64) -> MedicineLot {
        MedicineLot {
            id: id.to_string(),
            name: format!("Medicine {}", id),
            quantity,
            cost_price_paise: cost,
            selling_price_paise: sell,
            expiry: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_line_uses_lot_price() {
        let mut cart = Cart::new();
        cart.add_line(&lot("m1", 10, 500, 800), 3, None, vec![])
            .unwrap();

        let settlement = cart.settlement();
        assert_eq!(settlement.bill_total, Money::from_paise(2400));
        assert_eq!(settlement.profit, Money::from_paise(900));
    }

    #[test]
    fn test_custom_price_and_timings() {
        let mut cart = Cart::new();
        let timings = vec![DoseTiming::standard(DoseSlot::Night)];
        cart.add_line(
            &lot("m1", 10, 600, 1000),
            1,
            Some(Money::from_paise(1200)),
            timings.clone(),
        )
        .unwrap();

        assert_eq!(cart.lines[0].selling_price_paise, 1200);
        assert_eq!(cart.lines[0].timings, timings);
    }

    #[test]
    fn test_same_lot_twice_is_netted_against_stock() {
        let mut cart = Cart::new();
        let m1 = lot("m1", 5, 100, 200);

        cart.add_line(&m1, 3, None, vec![]).unwrap();
        let err = cart.add_line(&m1, 4, None, vec![]).unwrap_err();

        assert!(err.contains("Only 5 units"));
        assert_eq!(cart.lines.len(), 1);

        cart.add_line(&m1, 2, Some(Money::from_paise(150)), vec![])
            .unwrap();
        assert_eq!(cart.units_for("m1"), 5);
        assert_eq!(cart.lines.len(), 2);
    }

    #[test]
    fn test_rejects_bad_quantity_and_price() {
        let mut cart = Cart::new();
        let m1 = lot("m1", 10, 100, 200);

        assert!(cart.add_line(&m1, 0, None, vec![]).is_err());
        assert!(cart
            .add_line(&m1, 1, Some(Money::from_paise(-1)), vec![])
            .is_err());
        assert!(cart
            .add_line(&m1, 1, Some(Money::from_paise(MAX_PRICE_PAISE + 1)), vec![])
            .is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_line_by_index() {
        let mut cart = Cart::new();
        cart.add_line(&lot("m1", 10, 100, 200), 1, None, vec![])
            .unwrap();
        cart.add_line(&lot("m2", 10, 100, 300), 1, None, vec![])
            .unwrap();

        let removed = cart.remove_line(0).unwrap();
        assert_eq!(removed.lot_id, "m1");
        assert_eq!(cart.lines[0].lot_id, "m2");
        assert!(cart.remove_line(5).is_err());
    }

    #[test]
    fn test_remove_committed_keeps_later_lines() {
        let mut cart = Cart::new();
        let m1 = lot("m1", 10, 100, 200);
        cart.add_line(&m1, 1, None, vec![]).unwrap();
        cart.add_line(&m1, 1, None, vec![]).unwrap();
        let committed = cart.lines.clone();

        cart.add_line(&lot("m2", 10, 100, 300), 2, None, vec![])
            .unwrap();
        cart.remove_committed(&committed);

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].lot_id, "m2");

        cart.remove_committed(&cart.lines.clone());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear() {
        let state = CartState::new();
        state
            .with_cart_mut(|c| c.add_line(&lot("m1", 10, 100, 200), 2, None, vec![]))
            .unwrap();
        assert_eq!(state.snapshot().len(), 1);

        state.with_cart_mut(|c| c.clear());
        assert!(state.with_cart(|c| c.is_empty()));
    }
}
