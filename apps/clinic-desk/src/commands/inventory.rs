//! # Inventory Commands
//!
//! Medicine stock listing, search and edits.
//!
//! ## Inventory Screen
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  🔍 "dolo"                                    [+ Add Medicine]         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  Dolo 650        Qty 42    Cost ₹1.50   MRP ₹2.10   Exp 2027-03  [-][+]│
//! │  Dolo 500        Qty  3 ⚠  Cost ₹1.10   MRP ₹1.60   Exp 2026-11  [-][+]│
//! └─────────────────────────────────────────────────────────────────────────┘
//!      search_inventory           adjust_stock(±1) ──────────────────┘
//! ```

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use clinic_core::validation::{validate_search_query, validate_uuid};
use clinic_core::{MedicineLot, MedicineUpdate, NewMedicine};

/// Default and maximum number of search results.
const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 100;

/// Medicine DTO for the UI, with display flags derived at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDto {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub cost_price_paise: i64,
    pub selling_price_paise: i64,
    /// "YYYY-MM"
    pub expiry: Option<String>,
    /// Below the configured threshold.
    pub low_stock: bool,
    /// Expiry month has already ended.
    pub expired: bool,
}

impl MedicineDto {
    pub fn from_lot(lot: MedicineLot, low_stock_threshold: i64, today: NaiveDate) -> Self {
        MedicineDto {
            low_stock: lot.is_low_stock(low_stock_threshold),
            expired: lot.expiry.is_some_and(|e| e.is_expired_on(today)),
            expiry: lot.expiry.map(|e| e.to_string()),
            id: lot.id,
            name: lot.name,
            quantity: lot.quantity,
            cost_price_paise: lot.cost_price_paise,
            selling_price_paise: lot.selling_price_paise,
        }
    }
}

fn to_dtos(lots: Vec<MedicineLot>, config: &ConfigState) -> Vec<MedicineDto> {
    let today = Local::now().date_naive();
    lots.into_iter()
        .map(|lot| MedicineDto::from_lot(lot, config.low_stock_threshold, today))
        .collect()
}

/// All lots, ordered by name.
pub async fn list_inventory(
    db: &DbState,
    config: &ConfigState,
) -> Result<Vec<MedicineDto>, ApiError> {
    debug!("list_inventory command");
    let lots = db.inner().inventory().list().await?;
    Ok(to_dtos(lots, config))
}

/// Case-insensitive name search.
///
/// ## Arguments
/// * `query` - Substring of the medicine name (empty lists everything)
/// * `limit` - Maximum results to return (default: 20, max: 100)
pub async fn search_inventory(
    db: &DbState,
    config: &ConfigState,
    query: String,
    limit: Option<u32>,
) -> Result<Vec<MedicineDto>, ApiError> {
    let start = Instant::now();
    let query = validate_search_query(&query)?;
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

    debug!(query = %query, limit = %limit, "search_inventory command");

    let lots = db.inner().inventory().search(&query, limit).await?;
    let dtos = to_dtos(lots, config);

    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        "search_inventory complete"
    );

    Ok(dtos)
}

/// Gets a single lot by its UUID.
pub async fn get_medicine(
    db: &DbState,
    config: &ConfigState,
    id: String,
) -> Result<MedicineDto, ApiError> {
    debug!(id = %id, "get_medicine command");
    validate_uuid(&id)?;

    let lot = db
        .inner()
        .inventory()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Medicine", &id))?;

    Ok(MedicineDto::from_lot(
        lot,
        config.low_stock_threshold,
        Local::now().date_naive(),
    ))
}

/// Adds a new lot from the add-medicine form.
pub async fn add_medicine(
    db: &DbState,
    config: &ConfigState,
    input: NewMedicine,
) -> Result<MedicineDto, ApiError> {
    debug!(name = %input.name, "add_medicine command");
    input.validate()?;

    let lot = db.inner().inventory().insert(&input).await?;
    info!(id = %lot.id, name = %lot.name, quantity = lot.quantity, "Medicine added");

    Ok(MedicineDto::from_lot(
        lot,
        config.low_stock_threshold,
        Local::now().date_naive(),
    ))
}

/// Applies a direct edit to a lot.
pub async fn update_medicine(
    db: &DbState,
    config: &ConfigState,
    id: String,
    changes: MedicineUpdate,
) -> Result<MedicineDto, ApiError> {
    debug!(id = %id, "update_medicine command");
    validate_uuid(&id)?;

    if changes.is_empty() {
        return Err(ApiError::validation("Nothing to update"));
    }
    changes.validate()?;

    let lot = db.inner().inventory().update(&id, &changes).await?;
    info!(id = %lot.id, quantity = lot.quantity, "Medicine updated");

    Ok(MedicineDto::from_lot(
        lot,
        config.low_stock_threshold,
        Local::now().date_naive(),
    ))
}

/// Quick ±delta stock correction. Rejected if the result would be negative.
pub async fn adjust_stock(
    db: &DbState,
    config: &ConfigState,
    id: String,
    delta: i64,
) -> Result<MedicineDto, ApiError> {
    debug!(id = %id, delta = %delta, "adjust_stock command");
    validate_uuid(&id)?;

    if delta == 0 {
        return Err(ApiError::validation("Stock change must not be zero"));
    }

    let lot = db.inner().inventory().adjust_stock(&id, delta).await?;
    info!(id = %lot.id, delta, quantity = lot.quantity, "Stock adjusted");

    Ok(MedicineDto::from_lot(
        lot,
        config.low_stock_threshold,
        Local::now().date_naive(),
    ))
}

/// Lots below the configured threshold, lowest stock first.
pub async fn low_stock(
    db: &DbState,
    config: &ConfigState,
) -> Result<Vec<MedicineDto>, ApiError> {
    debug!(threshold = config.low_stock_threshold, "low_stock command");
    let lots = db
        .inner()
        .inventory()
        .low_stock(config.low_stock_threshold)
        .await?;
    Ok(to_dtos(lots, config))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use clinic_core::ExpiryMonth;
    use clinic_db::{Database, DbConfig};

    async fn setup() -> (DbState, ConfigState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (DbState::new(db), ConfigState::default())
    }

    fn new_medicine(name: &str, quantity: i64) -> NewMedicine {
        NewMedicine {
            name: name.to_string(),
            quantity,
            cost_price_paise: 150,
            selling_price_paise: 210,
            expiry: Some(ExpiryMonth::new(2030, 3).unwrap()),
        }
    }

    #[test]
    fn test_dto_flags() {
        let now = chrono::Utc::now();
        let lot = MedicineLot {
            id: "m1".to_string(),
            name: "Dolo 650".to_string(),
            quantity: 3,
            cost_price_paise: 150,
            selling_price_paise: 210,
            expiry: Some(ExpiryMonth::new(2024, 1).unwrap()),
            created_at: now,
            updated_at: now,
        };
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        let dto = MedicineDto::from_lot(lot, 5, today);
        assert!(dto.low_stock);
        assert!(dto.expired);
        assert_eq!(dto.expiry.as_deref(), Some("2024-01"));
    }

    #[tokio::test]
    async fn test_add_then_search() {
        let (db, config) = setup().await;
        add_medicine(&db, &config, new_medicine("  Dolo 650 ", 42))
            .await
            .unwrap();
        add_medicine(&db, &config, new_medicine("Azithral 500", 6))
            .await
            .unwrap();

        let found = search_inventory(&db, &config, "DOLO".to_string(), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dolo 650");

        let all = list_inventory(&db, &config).await.unwrap();
        assert_eq!(all[0].name, "Azithral 500");
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_form() {
        let (db, config) = setup().await;
        let err = add_medicine(&db, &config, new_medicine("Dolo 650", 0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_rejected() {
        let (db, config) = setup().await;
        let lot = add_medicine(&db, &config, new_medicine("Pan 40", 2))
            .await
            .unwrap();

        let err = adjust_stock(&db, &config, lot.id.clone(), -3)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let lot = adjust_stock(&db, &config, lot.id, -2).await.unwrap();
        assert_eq!(lot.quantity, 0);
        assert!(lot.low_stock);
    }

    #[tokio::test]
    async fn test_update_requires_changes() {
        let (db, config) = setup().await;
        let lot = add_medicine(&db, &config, new_medicine("Pan 40", 20))
            .await
            .unwrap();

        let err = update_medicine(&db, &config, lot.id.clone(), MedicineUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let changes = MedicineUpdate {
            selling_price_paise: Some(250),
            ..Default::default()
        };
        let updated = update_medicine(&db, &config, lot.id, changes).await.unwrap();
        assert_eq!(updated.selling_price_paise, 250);
        assert_eq!(updated.quantity, 20);
    }

    #[tokio::test]
    async fn test_low_stock_uses_config_threshold() {
        let (db, _) = setup().await;
        let config = ConfigState {
            low_stock_threshold: 10,
            ..ConfigState::default()
        };
        add_medicine(&db, &config, new_medicine("Pan 40", 8))
            .await
            .unwrap();
        add_medicine(&db, &config, new_medicine("Dolo 650", 40))
            .await
            .unwrap();

        let low = low_stock(&db, &config).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Pan 40");
    }

    #[tokio::test]
    async fn test_get_unknown_medicine() {
        let (db, config) = setup().await;
        let id = "00000000-0000-4000-8000-000000000000".to_string();
        let err = get_medicine(&db, &config, id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
