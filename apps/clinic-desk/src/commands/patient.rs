//! # Patient Commands
//!
//! Lookup by phone when the doctor starts typing a number, and the history
//! view for a returning patient.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use clinic_core::validation::validate_phone;
use clinic_core::{Bill, Patient, Prescription};

/// Everything on record for one phone number, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientHistory {
    /// `None` for a number that was only ever billed anonymously.
    pub patient: Option<Patient>,
    pub bills: Vec<Bill>,
    pub prescriptions: Vec<Prescription>,
}

/// Looks up a patient to prefill the finalize form.
pub async fn get_patient(db: &DbState, phone: String) -> Result<Option<Patient>, ApiError> {
    let phone = validate_phone(&phone)?;
    debug!(phone = %phone, "get_patient command");
    Ok(db.inner().patients().get(&phone).await?)
}

pub async fn patient_history(db: &DbState, phone: String) -> Result<PatientHistory, ApiError> {
    let phone = validate_phone(&phone)?;
    debug!(phone = %phone, "patient_history command");

    let db = db.inner();
    Ok(PatientHistory {
        patient: db.patients().get(&phone).await?,
        bills: db.ledger().bills_for_patient(&phone).await?,
        prescriptions: db.ledger().prescriptions_for_patient(&phone).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{DispenseLine, NewMedicine};
    use clinic_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_history_for_anonymous_dispense() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let lot = db
            .inventory()
            .insert(&NewMedicine {
                name: "Pan 40".to_string(),
                quantity: 10,
                cost_price_paise: 90,
                selling_price_paise: 120,
                expiry: None,
            })
            .await
            .unwrap();
        db.dispenser()
            .commit_dispense("9876543210", &[DispenseLine::from_lot(&lot, 2, None)])
            .await
            .unwrap();
        let db = DbState::new(db);

        let history = patient_history(&db, "98765 43210".to_string()).await.unwrap();
        assert!(history.patient.is_none());
        assert_eq!(history.bills.len(), 1);
        assert_eq!(history.prescriptions.len(), 1);
        assert_eq!(history.bills[0].bill_total_paise, 240);
    }

    #[tokio::test]
    async fn test_invalid_phone() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        assert!(get_patient(&db, "12".to_string()).await.is_err());
        assert!(get_patient(&db, "9876543210".to_string())
            .await
            .unwrap()
            .is_none());
    }
}
