//! # Cart Commands
//!
//! Building the prescription before it is finalized.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Preview  │────►│ Finalized│       │
//! │  │  Cart    │     │          │     │          │     │   Bill   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                   add_to_cart       finalize_prescription              │
//! │                   remove_from_cart  (prescription.rs)                  │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────────►                   │
//! │                                                      (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::{Cart, CartState, DbState};
use clinic_core::settlement::Settlement;
use clinic_core::{DispenseLine, DoseTiming, Money};
use clinic_db::DispensePreview;

/// Cart response including lines and settled totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<DispenseLine>,
    pub settlement: Settlement,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            lines: cart.lines.clone(),
            settlement: cart.settlement(),
        }
    }
}

/// A medicine picked in the cart form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub lot_id: String,
    /// Default: 1
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Overrides the lot's selling price for this line.
    #[serde(default)]
    pub selling_price_paise: Option<i64>,
    #[serde(default)]
    pub timings: Vec<DoseTiming>,
}

/// Gets the current cart contents.
pub fn get_cart(cart: &CartState) -> CartResponse {
    debug!("get_cart command");
    cart.with_cart(|c| CartResponse::from(c))
}

/// Adds a medicine line to the cart.
///
/// ## Behavior
/// - Prices are frozen at the moment of adding
/// - The same lot may be added again as a separate line
/// - Rejected when the lot doesn't have enough units for what's in the cart
///   plus this line
pub async fn add_to_cart(
    db: &DbState,
    cart: &CartState,
    request: AddToCartRequest,
) -> Result<CartResponse, ApiError> {
    let quantity = request.quantity.unwrap_or(1);
    debug!(lot_id = %request.lot_id, quantity = %quantity, "add_to_cart command");

    let lot = db
        .inner()
        .inventory()
        .get_by_id(&request.lot_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Medicine", &request.lot_id))?;

    let selling_price = request.selling_price_paise.map(Money::from_paise);

    cart.with_cart_mut(|c| {
        c.add_line(&lot, quantity, selling_price, request.timings)?;
        Ok::<CartResponse, String>(CartResponse::from(&*c))
    })
    .map_err(ApiError::cart)
}

/// Removes the line at `index` (0-based, as displayed).
pub fn remove_from_cart(cart: &CartState, index: usize) -> Result<CartResponse, ApiError> {
    debug!(index, "remove_from_cart command");

    cart.with_cart_mut(|c| {
        c.remove_line(index)?;
        Ok::<CartResponse, String>(CartResponse::from(&*c))
    })
    .map_err(ApiError::cart)
}

/// Clears all lines from the cart.
pub fn clear_cart(cart: &CartState) -> CartResponse {
    debug!("clear_cart command");

    cart.with_cart_mut(|c| {
        c.clear();
        CartResponse::from(&*c)
    })
}

/// Settles the cart and checks it against current stock without writing.
pub async fn preview_cart(db: &DbState, cart: &CartState) -> Result<DispensePreview, ApiError> {
    debug!("preview_cart command");
    let lines = cart.snapshot();
    Ok(db.inner().dispenser().preview(&lines).await?)
}

// =============================================================================
// Unit Tests
// =============================================================================
