//! # Patient Repository
//!
//! Patients are keyed by phone number. Saving a patient merges with what is
//! already stored: blank fields in the new record never erase known ones.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::{Gender, Patient};

#[derive(Debug, sqlx::FromRow)]
struct PatientRow {
    phone: String,
    name: String,
    age: Option<i64>,
    gender: Gender,
    last_visit: Option<DateTime<Utc>>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> DbResult<Self> {
        let age = row
            .age
            .map(u32::try_from)
            .transpose()
            .map_err(|e| DbError::corrupt("Patient", &row.phone, e))?;

        Ok(Patient {
            phone: row.phone,
            name: row.name,
            age,
            gender: row.gender,
            last_visit: row.last_visit,
        })
    }
}

/// Repository for patient records.
#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: SqlitePool,
}

impl PatientRepository {
    /// Creates a new PatientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PatientRepository { pool }
    }

    /// Looks up a patient by phone.
    pub async fn get(&self, phone: &str) -> DbResult<Option<Patient>> {
        let row = sqlx::query_as::<_, PatientRow>(
            "SELECT phone, name, age, gender, last_visit FROM patients WHERE phone = ?1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Patient::try_from).transpose()
    }

    /// Inserts or merges a patient, then returns the stored record.
    pub async fn upsert(&self, patient: &Patient) -> DbResult<Patient> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_with(&mut conn, patient).await?;
        drop(conn);

        self.get(&patient.phone)
            .await?
            .ok_or_else(|| DbError::not_found("Patient", &patient.phone))
    }

    /// Merge-write on an existing connection (used inside the dispense
    /// transaction).
    ///
    /// ## Merge Rules
    /// ```text
    /// name        kept when the new one is blank
    /// age         kept when the new one is absent
    /// gender      always replaced
    /// last_visit  kept when the new one is absent
    /// ```
    pub async fn upsert_with(conn: &mut SqliteConnection, patient: &Patient) -> DbResult<()> {
        debug!(phone = %patient.phone, "Upserting patient");

        sqlx::query(
            r#"
            INSERT INTO patients (phone, name, age, gender, last_visit)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (phone) DO UPDATE SET
                name       = CASE WHEN excluded.name <> '' THEN excluded.name ELSE patients.name END,
                age        = COALESCE(excluded.age, patients.age),
                gender     = excluded.gender,
                last_visit = COALESCE(excluded.last_visit, patients.last_visit)
            "#,
        )
        .bind(&patient.phone)
        .bind(patient.name.trim())
        .bind(patient.age.map(i64::from))
        .bind(patient.gender)
        .bind(patient.last_visit)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_merges_blank_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.patients();

        let first = Patient {
            phone: "9876543210".to_string(),
            name: "Rahul".to_string(),
            age: Some(24),
            gender: Gender::Male,
            last_visit: Some(Utc::now()),
        };
        repo.upsert(&first).await.unwrap();

        let visit_only = Patient::anonymous("9876543210");
        let merged = repo.upsert(&visit_only).await.unwrap();

        assert_eq!(merged.name, "Rahul");
        assert_eq!(merged.age, Some(24));
        assert_eq!(merged.last_visit, first.last_visit);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gender_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut patient = Patient::anonymous("9123456789");
        patient.name = "Asha".to_string();
        patient.gender = Gender::Female;

        db.patients().upsert(&patient).await.unwrap();
        let fetched = db.patients().get("9123456789").await.unwrap().unwrap();
        assert_eq!(fetched.gender, Gender::Female);
        assert!(db.patients().get("0000000").await.unwrap().is_none());
    }
}
