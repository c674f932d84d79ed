//! # Ledger Repository
//!
//! Append-only storage for bills and prescriptions.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bills ─────────────┐            prescriptions ─────────┐               │
//! │  id, patient_phone  │            id, patient_phone      │               │
//! │  bill_total, profit │            created_at             │               │
//! │  created_at         │                                   │               │
//! │                     ▼                                   ▼               │
//! │  bill_items (bill_id, position)  prescription_items (id, position)      │
//! │  name, qty, prices, total        name, qty, prices, total, timings JSON │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes only happen through the ledger writer's transaction, which is
//! why the insert functions take a connection instead of using the pool.
//! Nothing here updates or deletes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::{Bill, BillItem, DoseTiming, Prescription, PrescriptionItem};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: String,
    patient_phone: String,
    bill_total_paise: i64,
    profit_paise: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BillItemRow {
    bill_id: String,
    lot_id: String,
    name: String,
    quantity: i64,
    cost_price_paise: i64,
    selling_price_paise: i64,
    total_paise: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PrescriptionRow {
    id: String,
    patient_phone: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PrescriptionItemRow {
    prescription_id: String,
    lot_id: String,
    name: String,
    quantity: i64,
    cost_price_paise: i64,
    selling_price_paise: i64,
    total_paise: i64,
    timings: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for bill and prescription records.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Writes (inside the dispense transaction)
    // -------------------------------------------------------------------------

    /// Appends a prescription and its lines.
    pub async fn insert_prescription(
        conn: &mut SqliteConnection,
        prescription: &Prescription,
    ) -> DbResult<()> {
        debug!(id = %prescription.id, lines = prescription.items.len(), "Inserting prescription");

        sqlx::query("INSERT INTO prescriptions (id, patient_phone, created_at) VALUES (?1, ?2, ?3)")
            .bind(&prescription.id)
            .bind(&prescription.patient_phone)
            .bind(prescription.created_at)
            .execute(&mut *conn)
            .await?;

        for (position, item) in prescription.items.iter().enumerate() {
            let timings = serde_json::to_string(&item.timings)
                .map_err(|e| DbError::Internal(format!("encoding dose timings: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO prescription_items (
                    prescription_id, position, lot_id, name, quantity,
                    cost_price_paise, selling_price_paise, total_paise, timings
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&prescription.id)
            .bind(position as i64)
            .bind(&item.lot_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.cost_price_paise)
            .bind(item.selling_price_paise)
            .bind(item.total_paise)
            .bind(timings)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Appends a bill and its lines.
    pub async fn insert_bill(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, total = bill.bill_total_paise, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (id, patient_phone, bill_total_paise, profit_paise, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.patient_phone)
        .bind(bill.bill_total_paise)
        .bind(bill.profit_paise)
        .bind(bill.created_at)
        .execute(&mut *conn)
        .await?;

        for (position, item) in bill.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    bill_id, position, lot_id, name, quantity,
                    cost_price_paise, selling_price_paise, total_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&bill.id)
            .bind(position as i64)
            .bind(&item.lot_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.cost_price_paise)
            .bind(item.selling_price_paise)
            .bind(item.total_paise)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bills
    // -------------------------------------------------------------------------

    /// All bills, newest first.
    pub async fn list_bills(&self) -> DbResult<Vec<Bill>> {
        let rows = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, patient_phone, bill_total_paise, profit_paise, created_at
            FROM bills
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.with_bill_items(rows).await
    }

    /// Bills created at or after `since`, newest first.
    pub async fn bills_since(&self, since: DateTime<Utc>) -> DbResult<Vec<Bill>> {
        let rows = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, patient_phone, bill_total_paise, profit_paise, created_at
            FROM bills
            WHERE created_at >= ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        self.with_bill_items(rows).await
    }

    /// A patient's bills, newest first.
    pub async fn bills_for_patient(&self, phone: &str) -> DbResult<Vec<Bill>> {
        let rows = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, patient_phone, bill_total_paise, profit_paise, created_at
            FROM bills
            WHERE patient_phone = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        self.with_bill_items(rows).await
    }

    pub async fn get_bill(&self, id: &str) -> DbResult<Option<Bill>> {
        let row = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, patient_phone, bill_total_paise, profit_paise, created_at
            FROM bills
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_bill_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn count_bills(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn with_bill_items(&self, rows: Vec<BillRow>) -> DbResult<Vec<Bill>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT bill_id, lot_id, name, quantity, cost_price_paise, selling_price_paise, \
             total_paise FROM bill_items WHERE bill_id IN (",
        );
        let mut separated = qb.separated(", ");
        for row in &rows {
            separated.push_bind(row.id.as_str());
        }
        separated.push_unseparated(") ORDER BY bill_id, position");

        let item_rows = qb
            .build_query_as::<BillItemRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut items: HashMap<String, Vec<BillItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.bill_id).or_default().push(BillItem {
                lot_id: row.lot_id,
                name: row.name,
                quantity: row.quantity,
                cost_price_paise: row.cost_price_paise,
                selling_price_paise: row.selling_price_paise,
                total_paise: row.total_paise,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Bill {
                items: items.remove(&row.id).unwrap_or_default(),
                id: row.id,
                patient_phone: row.patient_phone,
                bill_total_paise: row.bill_total_paise,
                profit_paise: row.profit_paise,
                created_at: row.created_at,
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Prescriptions
    // -------------------------------------------------------------------------

    /// A patient's prescriptions, newest first.
    pub async fn prescriptions_for_patient(&self, phone: &str) -> DbResult<Vec<Prescription>> {
        let rows = sqlx::query_as::<_, PrescriptionRow>(
            r#"
            SELECT id, patient_phone, created_at
            FROM prescriptions
            WHERE patient_phone = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        self.with_prescription_items(rows).await
    }

    pub async fn get_prescription(&self, id: &str) -> DbResult<Option<Prescription>> {
        let row = sqlx::query_as::<_, PrescriptionRow>(
            "SELECT id, patient_phone, created_at FROM prescriptions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_prescription_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn count_prescriptions(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prescriptions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn with_prescription_items(
        &self,
        rows: Vec<PrescriptionRow>,
    ) -> DbResult<Vec<Prescription>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT prescription_id, lot_id, name, quantity, cost_price_paise, \
             selling_price_paise, total_paise, timings FROM prescription_items \
             WHERE prescription_id IN (",
        );
        let mut separated = qb.separated(", ");
        for row in &rows {
            separated.push_bind(row.id.as_str());
        }
        separated.push_unseparated(") ORDER BY prescription_id, position");

        let item_rows = qb
            .build_query_as::<PrescriptionItemRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut items: HashMap<String, Vec<PrescriptionItem>> = HashMap::new();
        for row in item_rows {
            let timings: Vec<DoseTiming> = serde_json::from_str(&row.timings)
                .map_err(|e| DbError::corrupt("Prescription", &row.prescription_id, e))?;

            items
                .entry(row.prescription_id)
                .or_default()
                .push(PrescriptionItem {
                    lot_id: row.lot_id,
                    name: row.name,
                    quantity: row.quantity,
                    cost_price_paise: row.cost_price_paise,
                    selling_price_paise: row.selling_price_paise,
                    total_paise: row.total_paise,
                    timings,
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| Prescription {
                items: items.remove(&row.id).unwrap_or_default(),
                id: row.id,
                patient_phone: row.patient_phone,
                created_at: row.created_at,
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use clinic_core::{DoseSlot, FoodInstruction};

    fn bill(id: &str, phone: &str, created_at: DateTime<Utc>) -> Bill {
        Bill {
            id: id.to_string(),
            patient_phone: phone.to_string(),
            items: vec![
                BillItem {
                    lot_id: "m1".to_string(),
                    name: "Dolo 650".to_string(),
                    quantity: 3,
                    cost_price_paise: 500,
                    selling_price_paise: 800,
                    total_paise: 2400,
                },
                BillItem {
                    lot_id: "m2".to_string(),
                    name: "Pan 40".to_string(),
                    quantity: 1,
                    cost_price_paise: 100,
                    selling_price_paise: 150,
                    total_paise: 150,
                },
            ],
            bill_total_paise: 2550,
            profit_paise: 950,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_bills_round_trip_in_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let older = bill("b1", "9876543210", now - Duration::days(2));
        let newer = bill("b2", "9123456789", now);

        let mut conn = db.pool().acquire().await.unwrap();
        LedgerRepository::insert_bill(&mut conn, &older).await.unwrap();
        LedgerRepository::insert_bill(&mut conn, &newer).await.unwrap();
        drop(conn);

        let ledger = db.ledger();
        let all = ledger.list_bills().await.unwrap();
        assert_eq!(all.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["b2", "b1"]);
        assert_eq!(all[1], older);

        let mine = ledger.bills_for_patient("9876543210").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].items[1].name, "Pan 40");

        let recent = ledger.bills_since(now - Duration::days(1)).await.unwrap();
        assert_eq!(recent.len(), 1);

        assert!(ledger.get_bill("missing").await.unwrap().is_none());
        assert_eq!(ledger.count_bills().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prescription_keeps_timings() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let prescription = Prescription {
            id: "p1".to_string(),
            patient_phone: "9876543210".to_string(),
            items: vec![PrescriptionItem {
                lot_id: "m1".to_string(),
                name: "Dolo 650".to_string(),
                quantity: 3,
                cost_price_paise: 500,
                selling_price_paise: 800,
                total_paise: 2400,
                timings: vec![DoseTiming {
                    slot: DoseSlot::Night,
                    dose: "1/2".to_string(),
                    food: Some(FoodInstruction::Before),
                }],
            }],
            created_at: Utc::now(),
        };

        let mut conn = db.pool().acquire().await.unwrap();
        LedgerRepository::insert_prescription(&mut conn, &prescription)
            .await
            .unwrap();
        drop(conn);

        let fetched = db.ledger().get_prescription("p1").await.unwrap().unwrap();
        assert_eq!(fetched, prescription);

        let history = db
            .ledger()
            .prescriptions_for_patient("9876543210")
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }
}
