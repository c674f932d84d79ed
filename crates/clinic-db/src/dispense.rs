//! # Ledger Writer
//!
//! Turns an in-memory prescription cart into stored records: prescription,
//! bill and reduced stock, all in one SQLite transaction.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_dispense(phone, lines)                                          │
//! │       │                                                                 │
//! │       ├── validate phone + lines ───────────► Rejected(Validation)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─ attempt (up to max_attempts) ─────────────────────────────────┐    │
//! │  │  read lots ─► reconcile (netted) ──────► Rejected(Insufficient) │    │
//! │  │  settle lines                                                   │    │
//! │  │  BEGIN                                                          │    │
//! │  │    [patient upsert]                                             │    │
//! │  │    INSERT prescription + items                                  │    │
//! │  │    INSERT bill + items                                          │    │
//! │  │    UPDATE inventory ... WHERE quantity = previous   (each lot)  │    │
//! │  │       └── 0 rows? ROLLBACK, next attempt                        │    │
//! │  │  COMMIT ─────────────────────────────────────────► Ok(Bill)     │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  all attempts conflicted ───────────────────► StockConflict             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any storage error inside the transaction drops it, which rolls back every
//! write made so far. A failed commit therefore never leaves a prescription
//! without its bill, or a bill without its stock change.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CommitStage, DispenseError, DispenseResult};
use crate::repository::inventory::InventoryRepository;
use crate::repository::ledger::LedgerRepository;
use crate::repository::patient::PatientRepository;
use clinic_core::reconcile::{self, StockAdjustment};
use clinic_core::settlement::{self, Settlement};
use clinic_core::validation::{validate_dispense_lines, validate_phone};
use clinic_core::{Bill, DispenseLine, Patient, Prescription};

/// How many times a commit is retried when stock changes underneath it.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// What a cart would do if committed now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensePreview {
    pub settlement: Settlement,
    pub adjustments: Vec<StockAdjustment>,
}

enum Attempt {
    Committed(Bill),
    Conflict { lot_id: String },
}

/// Commits dispense events atomically.
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    pool: SqlitePool,
    max_attempts: u32,
}

impl LedgerWriter {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerWriter {
            pool,
            max_attempts: MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Overrides the retry bound (minimum 1).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Settles `lines` and checks them against current stock without writing.
    pub async fn preview(&self, lines: &[DispenseLine]) -> DispenseResult<DispensePreview> {
        validate_dispense_lines(lines)?;
        let adjustments = self.read_and_reconcile(lines).await?;

        Ok(DispensePreview {
            settlement: settlement::compute_settlement(lines),
            adjustments,
        })
    }

    /// Commits a dispense for the patient identified by `patient_phone`.
    ///
    /// Returns the stored bill with its generated id and timestamp.
    pub async fn commit_dispense(
        &self,
        patient_phone: &str,
        lines: &[DispenseLine],
    ) -> DispenseResult<Bill> {
        let phone = validate_phone(patient_phone)?;
        self.commit(&phone, None, lines).await
    }

    /// Like [`commit_dispense`](Self::commit_dispense), and also records the
    /// patient's details and visit time in the same transaction.
    pub async fn commit_dispense_for(
        &self,
        patient: &Patient,
        lines: &[DispenseLine],
    ) -> DispenseResult<Bill> {
        let phone = validate_phone(&patient.phone)?;
        let patient = Patient {
            phone: phone.clone(),
            ..patient.clone()
        };
        self.commit(&phone, Some(&patient), lines).await
    }

    async fn commit(
        &self,
        phone: &str,
        patient: Option<&Patient>,
        lines: &[DispenseLine],
    ) -> DispenseResult<Bill> {
        validate_dispense_lines(lines)?;

        let mut last_conflict = String::new();
        for attempt in 1..=self.max_attempts {
            let adjustments = self.read_and_reconcile(lines).await?;

            match self.try_commit(phone, patient, lines, &adjustments).await? {
                Attempt::Committed(bill) => {
                    info!(
                        bill_id = %bill.id,
                        patient = %phone,
                        lines = lines.len(),
                        total = %bill.bill_total(),
                        profit = %bill.profit(),
                        attempt,
                        "Dispense committed"
                    );
                    return Ok(bill);
                }
                Attempt::Conflict { lot_id } => {
                    warn!(lot_id = %lot_id, attempt, "Stock changed during dispense, retrying");
                    last_conflict = lot_id;
                }
            }
        }

        Err(DispenseError::StockConflict {
            lot_id: last_conflict,
            attempts: self.max_attempts,
        })
    }

    async fn read_and_reconcile(
        &self,
        lines: &[DispenseLine],
    ) -> DispenseResult<Vec<StockAdjustment>> {
        let ids: Vec<String> = reconcile::net_quantities(lines)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let lots = InventoryRepository::new(self.pool.clone())
            .get_many(&ids)
            .await
            .map_err(DispenseError::storage(CommitStage::ReadStock))?;

        let adjustments = reconcile::reconcile(lines, &lots)?;
        debug!(lots = adjustments.len(), "Stock reconciled");
        Ok(adjustments)
    }

    async fn try_commit(
        &self,
        phone: &str,
        patient: Option<&Patient>,
        lines: &[DispenseLine],
        adjustments: &[StockAdjustment],
    ) -> DispenseResult<Attempt> {
        let now = Utc::now();
        let settlement = settlement::compute_settlement(lines);

        let prescription = Prescription {
            id: Uuid::new_v4().to_string(),
            patient_phone: phone.to_string(),
            items: settlement::prescription_items(lines),
            created_at: now,
        };
        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            patient_phone: phone.to_string(),
            bill_total_paise: settlement.bill_total.paise(),
            profit_paise: settlement.profit.paise(),
            items: settlement.items,
            created_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispenseError::storage(CommitStage::Begin)(e.into()))?;

        if let Some(patient) = patient {
            let visit = Patient {
                last_visit: Some(now),
                ..patient.clone()
            };
            PatientRepository::upsert_with(&mut *tx, &visit)
                .await
                .map_err(DispenseError::storage(CommitStage::Patient))?;
        }

        LedgerRepository::insert_prescription(&mut *tx, &prescription)
            .await
            .map_err(DispenseError::storage(CommitStage::Prescription))?;

        LedgerRepository::insert_bill(&mut *tx, &bill)
            .await
            .map_err(DispenseError::storage(CommitStage::Bill))?;

        for adjustment in adjustments {
            let applied = InventoryRepository::compare_and_set_quantity(
                &mut *tx,
                &adjustment.lot_id,
                adjustment.previous_quantity,
                adjustment.new_quantity,
                now,
            )
            .await
            .map_err(DispenseError::storage(CommitStage::Inventory))?;

            if !applied {
                tx.rollback()
                    .await
                    .map_err(|e| DispenseError::storage(CommitStage::Inventory)(e.into()))?;
                return Ok(Attempt::Conflict {
                    lot_id: adjustment.lot_id.clone(),
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| DispenseError::storage(CommitStage::Commit)(e.into()))?;

        Ok(Attempt::Committed(bill))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use clinic_core::{
        CoreError, Gender, Money, NewMedicine, ValidationError, MAX_CART_LINES, MAX_LINE_QUANTITY,
        MAX_PRICE_PAISE,
    };

    const PHONE: &str = "9876543210";

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn stock(db: &Database, name: &str, quantity: i64, cost: i64, sell: i64) -> String {
        db.inventory()
            .insert(&NewMedicine {
                name: name.to_string(),
                quantity,
                cost_price_paise: cost,
                selling_price_paise: sell,
                expiry: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn quantity(db: &Database, id: &str) -> i64 {
        db.inventory().get_by_id(id).await.unwrap().unwrap().quantity
    }

    async fn ledger_counts(db: &Database) -> (i64, i64) {
        let ledger = db.ledger();
        (
            ledger.count_prescriptions().await.unwrap(),
            ledger.count_bills().await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_commit_writes_bill_prescription_and_stock() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;

        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 3, 500, 800)];
        let bill = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap();

        assert_eq!(bill.bill_total(), Money::from_rupees(24));
        assert_eq!(bill.profit(), Money::from_rupees(9));
        assert_eq!(quantity(&db, &m1).await, 7);
        assert_eq!(ledger_counts(&db).await, (1, 1));

        let stored = db.ledger().get_bill(&bill.id).await.unwrap().unwrap();
        assert_eq!(stored, bill);

        let history = db.ledger().prescriptions_for_patient(PHONE).await.unwrap();
        assert_eq!(history[0].items[0].total_paise, 2400);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 2, 500, 800).await;

        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 5, 500, 800)];
        let err = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap_err();

        assert!(err.is_insufficient_stock());
        assert_eq!(quantity(&db, &m1).await, 2);
        assert_eq!(ledger_counts(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_same_lot_twice_is_netted() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 5, 500, 800).await;

        let lines = vec![
            DispenseLine::new(&m1, "Dolo 650", 3, 500, 800),
            DispenseLine::new(&m1, "Dolo 650", 4, 500, 800),
        ];
        let err = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap_err();

        assert!(matches!(
            err,
            DispenseError::Rejected(CoreError::InsufficientStock { requested: 7, available: 5, .. })
        ));
        assert_eq!(quantity(&db, &m1).await, 5);
        assert_eq!(ledger_counts(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_two_prices_for_one_medicine() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 600, 1000).await;

        let lines = vec![
            DispenseLine::new(&m1, "Dolo 650", 2, 600, 1000),
            DispenseLine::new(&m1, "Dolo 650", 1, 600, 1200),
        ];
        let bill = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap();

        assert_eq!(bill.bill_total(), Money::from_rupees(32));
        assert_eq!(bill.profit(), Money::from_rupees(14));
        assert_eq!(bill.items.len(), 2);
        assert_eq!(quantity(&db, &m1).await, 7);
    }

    #[tokio::test]
    async fn test_validation_happens_first() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;
        let writer = db.dispenser();

        let empty = writer.commit_dispense(PHONE, &[]).await.unwrap_err();
        assert!(matches!(
            empty,
            DispenseError::Rejected(CoreError::Validation(ValidationError::EmptyPrescription))
        ));

        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 1, 500, 800)];
        let no_phone = writer.commit_dispense("", &lines).await.unwrap_err();
        assert!(matches!(
            no_phone,
            DispenseError::Rejected(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let zero = vec![DispenseLine::new(&m1, "Dolo 650", 0, 500, 800)];
        assert!(writer.commit_dispense(PHONE, &zero).await.is_err());

        assert_eq!(quantity(&db, &m1).await, 10);
    }

    #[tokio::test]
    async fn test_unknown_lot_is_rejected() {
        let db = db().await;
        let lines = vec![DispenseLine::new("ghost", "Nothing", 1, 1, 1)];

        let err = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap_err();
        assert!(matches!(err, DispenseError::Rejected(CoreError::LotNotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_read_rolls_back_everything() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;
        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 3, 500, 800)];

        let stale = vec![StockAdjustment {
            lot_id: m1.clone(),
            previous_quantity: 12,
            dispensed: 3,
            new_quantity: 9,
        }];
        let attempt = db
            .dispenser()
            .try_commit(PHONE, None, &lines, &stale)
            .await
            .unwrap();

        assert!(matches!(attempt, Attempt::Conflict { ref lot_id } if lot_id == &m1));
        assert_eq!(quantity(&db, &m1).await, 10);
        assert_eq!(ledger_counts(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_commit_for_patient_records_visit() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;
        let patient = Patient {
            phone: "98765 43210".to_string(),
            name: "Rahul".to_string(),
            age: Some(24),
            gender: Gender::Male,
            last_visit: None,
        };

        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 1, 500, 800)];
        let bill = db.dispenser().commit_dispense_for(&patient, &lines).await.unwrap();

        assert_eq!(bill.patient_phone, PHONE);
        let stored = db.patients().get(PHONE).await.unwrap().unwrap();
        assert_eq!(stored.name, "Rahul");
        assert_eq!(stored.last_visit, Some(bill.created_at));
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;
        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 4, 500, 800)];

        let preview = db.dispenser().preview(&lines).await.unwrap();
        assert_eq!(preview.settlement.bill_total, Money::from_rupees(32));
        assert_eq!(preview.adjustments[0].new_quantity, 6);
        assert_eq!(quantity(&db, &m1).await, 10);
    }

    #[tokio::test]
    async fn test_storage_failure_is_typed() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;
        db.close().await;

        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 1, 500, 800)];
        let err = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap_err();
        assert!(matches!(
            err,
            DispenseError::Storage { stage: CommitStage::ReadStock, .. }
        ));
    }

    #[tokio::test]
    async fn test_bill_failure_rolls_back_prescription_and_stock() {
        let db = db().await;
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_bills BEFORE INSERT ON bills
            BEGIN
                SELECT RAISE(ABORT, 'bills are read-only');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let lines = vec![DispenseLine::new(&m1, "Dolo 650", 2, 500, 800)];
        let err = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap_err();

        assert!(matches!(
            err,
            DispenseError::Storage { stage: CommitStage::Bill, .. }
        ));
        assert_eq!(quantity(&db, &m1).await, 10);
        assert_eq!(ledger_counts(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_commit_at_price_ceiling() {
        let db = db().await;
        let m1 = stock(&db, "Insulin pen", 50_000, MAX_PRICE_PAISE, MAX_PRICE_PAISE).await;

        let lines: Vec<_> = (0..MAX_CART_LINES)
            .map(|_| DispenseLine::new(&m1, "Insulin pen", MAX_LINE_QUANTITY, 0, MAX_PRICE_PAISE))
            .collect();
        let bill = db.dispenser().commit_dispense(PHONE, &lines).await.unwrap();

        let units = MAX_LINE_QUANTITY * MAX_CART_LINES as i64;
        let expected = MAX_PRICE_PAISE * units;
        assert_eq!(bill.bill_total_paise, expected);
        assert_eq!(bill.profit_paise, expected);
        assert_eq!(quantity(&db, &m1).await, 50_000 - units);

        let overpriced = vec![DispenseLine::new(
            &m1,
            "Insulin pen",
            2,
            0,
            MAX_PRICE_PAISE * 9,
        )];
        let err = db
            .dispenser()
            .commit_dispense(PHONE, &overpriced)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispenseError::Rejected(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(ledger_counts(&db).await, (1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispenses_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("clinic.db")))
            .await
            .unwrap();
        let m1 = stock(&db, "Dolo 650", 10, 500, 800).await;

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let writer = db.dispenser();
                let lines = vec![DispenseLine::new(&m1, "Dolo 650", 6, 500, 800)];
                tokio::spawn(async move { writer.commit_dispense(PHONE, &lines).await })
            })
            .collect();

        let mut committed = 0;
        let mut short = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => committed += 1,
                Err(e) if e.is_insufficient_stock() => short += 1,
                Err(e) => panic!("unexpected dispense error: {e}"),
            }
        }

        assert_eq!((committed, short), (1, 1));
        assert_eq!(quantity(&db, &m1).await, 4);
        assert_eq!(ledger_counts(&db).await, (1, 1));
    }
}
