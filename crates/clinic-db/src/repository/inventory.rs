//! # Inventory Repository
//!
//! Database operations for medicine lots.
//!
//! ## Key Operations
//! - Add, edit and list lots
//! - Case-insensitive name search
//! - Manual stock corrections
//! - Compare-and-set quantity writes used by the dispense commit
//!
//! ## Compare-and-Set
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Session A reads m1 = 10          Session B reads m1 = 10               │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  UPDATE .. SET quantity = 4       UPDATE .. SET quantity = 7            │
//! │  WHERE id = m1 AND quantity = 10  WHERE id = m1 AND quantity = 10       │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  1 row  → committed               0 rows → conflict, re-read, retry     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use clinic_core::reconcile::apply_delta;
use clinic_core::{MedicineLot, MedicineUpdate, NewMedicine};

/// Row shape of the `inventory` table.
#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    id: String,
    name: String,
    quantity: i64,
    cost_price_paise: i64,
    selling_price_paise: i64,
    expiry: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LotRow> for MedicineLot {
    type Error = DbError;

    fn try_from(row: LotRow) -> DbResult<Self> {
        let expiry = row
            .expiry
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| DbError::corrupt("MedicineLot", &row.id, e))?;

        Ok(MedicineLot {
            id: row.id,
            name: row.name,
            quantity: row.quantity,
            cost_price_paise: row.cost_price_paise,
            selling_price_paise: row.selling_price_paise,
            expiry,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_lots(rows: Vec<LotRow>) -> DbResult<Vec<MedicineLot>> {
    rows.into_iter().map(MedicineLot::try_from).collect()
}

/// Repository for inventory database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.inventory();
///
/// let lot = repo.insert(&new_medicine).await?;
/// let hits = repo.search("dolo", 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Inserts a new lot with a generated id.
    ///
    /// Input is expected to be validated already.
    pub async fn insert(&self, input: &NewMedicine) -> DbResult<MedicineLot> {
        let now = Utc::now();
        let lot = MedicineLot {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            quantity: input.quantity,
            cost_price_paise: input.cost_price_paise,
            selling_price_paise: input.selling_price_paise,
            expiry: input.expiry,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %lot.id, name = %lot.name, quantity = lot.quantity, "Inserting medicine lot");

        sqlx::query(
            r#"
            INSERT INTO inventory (
                id, name, quantity, cost_price_paise, selling_price_paise,
                expiry, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&lot.id)
        .bind(&lot.name)
        .bind(lot.quantity)
        .bind(lot.cost_price_paise)
        .bind(lot.selling_price_paise)
        .bind(lot.expiry.map(|e| e.to_string()))
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(lot)
    }

    /// Gets a lot by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MedicineLot>> {
        let row = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, name, quantity, cost_price_paise, selling_price_paise,
                   expiry, created_at, updated_at
            FROM inventory
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MedicineLot::try_from).transpose()
    }

    /// Gets every lot in `ids` that exists. Missing ids are simply absent.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<MedicineLot>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, name, quantity, cost_price_paise, selling_price_paise, \
             expiry, created_at, updated_at FROM inventory WHERE id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = qb.build_query_as::<LotRow>().fetch_all(&self.pool).await?;
        into_lots(rows)
    }

    /// Lists all lots ordered by name.
    pub async fn list(&self) -> DbResult<Vec<MedicineLot>> {
        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, name, quantity, cost_price_paise, selling_price_paise,
                   expiry, created_at, updated_at
            FROM inventory
            ORDER BY name COLLATE NOCASE, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        into_lots(rows)
    }

    /// Case-insensitive substring search on the medicine name.
    ///
    /// An empty query lists everything (up to `limit`).
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<MedicineLot>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching inventory");

        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, name, quantity, cost_price_paise, selling_price_paise,
                   expiry, created_at, updated_at
            FROM inventory
            WHERE ?1 = '' OR instr(lower(name), lower(?1)) > 0
            ORDER BY name COLLATE NOCASE, created_at
            LIMIT ?2
            "#,
        )
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Search returned lots");
        into_lots(rows)
    }

    /// Lots with stock strictly below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<MedicineLot>> {
        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, name, quantity, cost_price_paise, selling_price_paise,
                   expiry, created_at, updated_at
            FROM inventory
            WHERE quantity < ?1
            ORDER BY quantity, name COLLATE NOCASE
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        into_lots(rows)
    }

    /// Applies a direct edit. Only the fields set in `update` change.
    pub async fn update(&self, id: &str, update: &MedicineUpdate) -> DbResult<MedicineLot> {
        debug!(id = %id, "Updating medicine lot");

        let result = sqlx::query(
            r#"
            UPDATE inventory SET
                name                = COALESCE(?2, name),
                quantity            = COALESCE(?3, quantity),
                cost_price_paise    = COALESCE(?4, cost_price_paise),
                selling_price_paise = COALESCE(?5, selling_price_paise),
                expiry              = COALESCE(?6, expiry),
                updated_at          = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.quantity)
        .bind(update.cost_price_paise)
        .bind(update.selling_price_paise)
        .bind(update.expiry.map(|e| e.to_string()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MedicineLot", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("MedicineLot", id))
    }

    /// Adds `delta` to a lot's stock (negative for write-offs).
    ///
    /// The check and the write are one statement, so a concurrent dispense
    /// cannot push the lot below zero in between.
    ///
    /// ## Errors
    /// - `NotFound` if the lot doesn't exist
    /// - `Rule(NegativeStock)` if the result would be below zero
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<MedicineLot> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND quantity + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let lot = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("MedicineLot", id))?;

        if result.rows_affected() == 0 {
            // Produces the NegativeStock error with the current quantity.
            apply_delta(&lot, delta)?;
        }

        Ok(lot)
    }

    /// Counts all lots.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sets `quantity` to `new_quantity` only if it still equals `expected`.
    ///
    /// Returns `false` when the row changed since it was read (or vanished).
    pub async fn compare_and_set_quantity(
        conn: &mut SqliteConnection,
        id: &str,
        expected: i64,
        new_quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = ?3, updated_at = ?4
            WHERE id = ?1 AND quantity = ?2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use clinic_core::{CoreError, ExpiryMonth};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn medicine(name: &str, quantity: i64) -> NewMedicine {
        NewMedicine {
            name: name.to_string(),
            quantity,
            cost_price_paise: 500,
            selling_price_paise: 800,
            expiry: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let mut input = medicine("  Dolo 650 ", 10);
        input.expiry = Some(ExpiryMonth::new(2027, 4).unwrap());

        let lot = db.inventory().insert(&input).await.unwrap();
        assert_eq!(lot.name, "Dolo 650");

        let fetched = db.inventory().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(fetched, lot);
        assert_eq!(fetched.expiry.map(|e| e.to_string()).as_deref(), Some("2027-04"));
        assert_eq!(db.inventory().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let db = db().await;
        let repo = db.inventory();
        repo.insert(&medicine("Dolo 650", 10)).await.unwrap();
        repo.insert(&medicine("Azithral 500", 10)).await.unwrap();
        repo.insert(&medicine("DOLONEX", 10)).await.unwrap();

        let hits = repo.search("dolo", 20).await.unwrap();
        let names: Vec<_> = hits.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Dolo 650", "DOLONEX"]);

        assert_eq!(repo.search("", 20).await.unwrap().len(), 3);
        assert_eq!(repo.search("", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = db().await;
        let repo = db.inventory();
        repo.insert(&medicine("Pan 40", 2)).await.unwrap();
        repo.insert(&medicine("Cetzine", 5)).await.unwrap();
        repo.insert(&medicine("Zincovit", 1)).await.unwrap();

        let low = repo.low_stock(5).await.unwrap();
        let names: Vec<_> = low.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Zincovit", "Pan 40"]);
    }

    #[tokio::test]
    async fn test_update_only_touches_set_fields() {
        let db = db().await;
        let repo = db.inventory();
        let lot = repo.insert(&medicine("Dolo 650", 10)).await.unwrap();

        let update = MedicineUpdate {
            selling_price_paise: Some(900),
            ..Default::default()
        };
        let updated = repo.update(&lot.id, &update).await.unwrap();

        assert_eq!(updated.selling_price_paise, 900);
        assert_eq!(updated.quantity, 10);
        assert_eq!(updated.name, "Dolo 650");

        let missing = repo.update("nope", &update).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let db = db().await;
        let repo = db.inventory();
        let lot = repo.insert(&medicine("Dolo 650", 4)).await.unwrap();

        assert_eq!(repo.adjust_stock(&lot.id, 6).await.unwrap().quantity, 10);
        assert_eq!(repo.adjust_stock(&lot.id, -10).await.unwrap().quantity, 0);

        let err = repo.adjust_stock(&lot.id, -1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::NegativeStock { current: 0, delta: -1, .. })
        ));
        assert!(matches!(
            repo.adjust_stock("nope", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let db = db().await;
        let repo = db.inventory();
        let a = repo.insert(&medicine("A", 1)).await.unwrap();
        let b = repo.insert(&medicine("B", 1)).await.unwrap();

        let lots = repo
            .get_many(&[a.id.clone(), "ghost".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(lots.len(), 2);
        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compare_and_set_quantity() {
        let db = db().await;
        let lot = db.inventory().insert(&medicine("Dolo 650", 10)).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let stale = InventoryRepository::compare_and_set_quantity(&mut conn, &lot.id, 9, 5, Utc::now())
            .await
            .unwrap();
        assert!(!stale);

        let fresh = InventoryRepository::compare_and_set_quantity(&mut conn, &lot.id, 10, 7, Utc::now())
            .await
            .unwrap();
        assert!(fresh);
        drop(conn);

        let lot = db.inventory().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(lot.quantity, 7);
    }
}
