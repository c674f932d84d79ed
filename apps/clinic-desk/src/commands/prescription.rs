//! # Prescription Commands
//!
//! Finalizing the cart into a prescription, a bill and a stock decrement.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  finalize_prescription(patient, target)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshot cart lines (lock released before any await)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerWriter::commit_dispense_for ── Err ──► cart untouched, ApiError  │
//! │       │  (patient + prescription + bill + stock, one transaction)       │
//! │       ▼ Ok(bill)                                                        │
//! │  remove the committed lines (later additions stay)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  build share message + deep link                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The share link is returned, never opened: launching it is the UI's job.

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartState, ConfigState, DbState};
use clinic_core::share::{prescription_message, share_link};
use clinic_core::validation::{validate_age, validate_phone};
use clinic_core::{Bill, Gender, Patient, ValidationError};

/// Patient details from the finalize form. Only the phone is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    pub phone: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Gender,
}

impl PatientInput {
    /// Validates the form and normalizes the phone.
    pub fn into_patient(self) -> Result<Patient, ValidationError> {
        let phone = validate_phone(&self.phone)?;
        if let Some(age) = self.age {
            validate_age(age)?;
        }

        Ok(Patient {
            phone,
            name: self.name.trim().to_string(),
            age: self.age,
            gender: self.gender,
            last_visit: None,
        })
    }
}

/// What the UI gets back after a successful finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub bill: Bill,
    /// Prescription summary text.
    pub message: String,
    /// Messaging deep link with the message prefilled.
    pub share_link: String,
}

/// Commits the cart for `patient`.
///
/// ## Behavior
/// - All-or-nothing: on any error the cart is kept and nothing is stored
/// - On success the committed lines leave the cart; lines added while the
///   commit was running stay for the next prescription
///
/// ## Errors
/// - `VALIDATION_ERROR`: bad phone/age, empty cart
/// - `INSUFFICIENT_STOCK`: a lot no longer has enough units
/// - `STOCK_CONFLICT`: concurrent dispenses kept winning the race
/// - `DATABASE_ERROR`: storage failed (rolled back)
pub async fn finalize_prescription(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    patient: PatientInput,
) -> Result<FinalizeResponse, ApiError> {
    debug!("finalize_prescription command");

    let patient = patient.into_patient()?;
    let lines = cart.snapshot();

    let bill = db
        .inner()
        .dispenser()
        .commit_dispense_for(&patient, &lines)
        .await?;

    cart.with_cart_mut(|c| c.remove_committed(&lines));

    let date = bill.created_at.with_timezone(&Local).date_naive();
    let message = prescription_message(
        &config.profile(),
        &patient.phone,
        Some(&patient),
        &lines,
        date,
    );
    let link = share_link(
        config.share_target,
        &patient.phone,
        &config.country_code,
        &message,
    );

    info!(
        bill_id = %bill.id,
        patient = %patient.phone,
        total = %config.format_currency(bill.bill_total_paise),
        "Prescription finalized"
    );

    Ok(FinalizeResponse {
        bill,
        message,
        share_link: link,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, get_cart, AddToCartRequest};
    use crate::error::ErrorCode;
    use clinic_core::{DoseSlot, DoseTiming, NewMedicine};
    use clinic_db::{Database, DbConfig};

    async fn setup(quantity: i64) -> (DbState, CartState, ConfigState, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let lot = db
            .inventory()
            .insert(&NewMedicine {
                name: "Dolo 650".to_string(),
                quantity,
                cost_price_paise: 500,
                selling_price_paise: 800,
                expiry: None,
            })
            .await
            .unwrap();
        (
            DbState::new(db),
            CartState::new(),
            ConfigState::default(),
            lot.id,
        )
    }

    fn patient() -> PatientInput {
        PatientInput {
            phone: "98765 43210".to_string(),
            name: "Rahul".to_string(),
            age: Some(24),
            gender: Gender::Male,
        }
    }

    async fn add(db: &DbState, cart: &CartState, lot_id: &str, quantity: i64) {
        add_to_cart(
            db,
            cart,
            AddToCartRequest {
                lot_id: lot_id.to_string(),
                quantity: Some(quantity),
                selling_price_paise: None,
                timings: vec![DoseTiming::standard(DoseSlot::Morning)],
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_finalize_commits_and_clears_cart() {
        let (db, cart, config, lot_id) = setup(10).await;
        add(&db, &cart, &lot_id, 3).await;

        let response = finalize_prescription(&db, &cart, &config, patient())
            .await
            .unwrap();

        assert_eq!(response.bill.bill_total_paise, 2400);
        assert_eq!(response.bill.profit_paise, 900);
        assert_eq!(response.bill.patient_phone, "9876543210");
        assert!(response.message.contains("Rahul (24/M)"));
        assert!(response.message.contains("Morning (1 • After)"));
        assert!(response
            .share_link
            .starts_with("https://web.whatsapp.com/send?phone=919876543210&text="));
        assert!(get_cart(&cart).lines.is_empty());

        let lot = db.inner().inventory().get_by_id(&lot_id).await.unwrap().unwrap();
        assert_eq!(lot.quantity, 7);

        let stored = db.inner().patients().get("9876543210").await.unwrap().unwrap();
        assert_eq!(stored.name, "Rahul");
        assert!(stored.last_visit.is_some());
    }

    #[tokio::test]
    async fn test_failed_finalize_keeps_cart() {
        let (db, cart, config, lot_id) = setup(10).await;
        add(&db, &cart, &lot_id, 6).await;

        // Stock drops after the line was added.
        db.inner().inventory().adjust_stock(&lot_id, -8).await.unwrap();

        let err = finalize_prescription(&db, &cart, &config, patient())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_cart(&cart).lines.len(), 1);
        assert_eq!(db.inner().ledger().count_bills().await.unwrap(), 0);
        assert_eq!(db.inner().ledger().count_prescriptions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let (db, cart, config, _) = setup(10).await;
        let err = finalize_prescription(&db, &cart, &config, patient())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_missing_phone_is_rejected() {
        let (db, cart, config, lot_id) = setup(10).await;
        add(&db, &cart, &lot_id, 1).await;

        let input = PatientInput {
            phone: "  ".to_string(),
            ..patient()
        };
        let err = finalize_prescription(&db, &cart, &config, input)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(get_cart(&cart).lines.len(), 1);
    }
}
