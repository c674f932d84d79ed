//! # Availability Repository
//!
//! The doctor's available/offline status, a single row. No row means offline.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use clinic_core::Availability;

#[derive(Debug, sqlx::FromRow)]
struct AvailabilityRow {
    online: bool,
    updated_at: DateTime<Utc>,
}

/// Repository for the availability flag.
#[derive(Debug, Clone)]
pub struct AvailabilityRepository {
    pool: SqlitePool,
}

impl AvailabilityRepository {
    /// Creates a new AvailabilityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AvailabilityRepository { pool }
    }

    /// Current status; offline if it was never set.
    pub async fn get(&self) -> DbResult<Availability> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            "SELECT online, updated_at FROM availability WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|r| Availability {
                online: r.online,
                updated_at: Some(r.updated_at),
            })
            .unwrap_or_else(Availability::offline))
    }

    /// Stores the status and returns what was written.
    pub async fn set(&self, online: bool) -> DbResult<Availability> {
        let now = Utc::now();
        debug!(online, "Setting availability");

        sqlx::query(
            r#"
            INSERT INTO availability (id, online, updated_at) VALUES (1, ?1, ?2)
            ON CONFLICT (id) DO UPDATE SET online = excluded.online, updated_at = excluded.updated_at
            "#,
        )
        .bind(online)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Availability {
            online,
            updated_at: Some(now),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_defaults_offline_then_toggles() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.availability();

        let initial = repo.get().await.unwrap();
        assert!(!initial.online);
        assert!(initial.updated_at.is_none());

        repo.set(true).await.unwrap();
        assert!(repo.get().await.unwrap().online);

        repo.set(false).await.unwrap();
        assert!(!repo.get().await.unwrap().online);
    }
}
