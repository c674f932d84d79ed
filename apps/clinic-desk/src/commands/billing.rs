//! # Billing Commands
//!
//! Bill history and the dashboard figures.
//!
//! ## Dashboard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Today: 4 patients   ₹1,240      This month: ₹18,400   (profit ₹5,100) │
//! │                                  Last month: ₹21,050                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//!          ▲
//!          │ compute_dashboard_stats(bills since 1st of last month, now)
//! ```
//!
//! Only bills from the first day of last month onward are loaded; older
//! bills can't land in any bucket.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use clinic_core::stats::{compute_dashboard_stats, previous_month, DashboardStats};
use clinic_core::validation::validate_phone;
use clinic_core::Bill;

/// All bills, newest first.
pub async fn list_bills(db: &DbState) -> Result<Vec<Bill>, ApiError> {
    debug!("list_bills command");
    Ok(db.inner().ledger().list_bills().await?)
}

/// One bill with its items.
pub async fn get_bill(db: &DbState, id: String) -> Result<Bill, ApiError> {
    debug!(id = %id, "get_bill command");
    db.inner()
        .ledger()
        .get_bill(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill", &id))
}

/// Bills for one patient, newest first.
pub async fn patient_bills(db: &DbState, phone: String) -> Result<Vec<Bill>, ApiError> {
    let phone = validate_phone(&phone)?;
    debug!(phone = %phone, "patient_bills command");
    Ok(db.inner().ledger().bills_for_patient(&phone).await?)
}

/// Dashboard figures for the machine's local calendar.
pub async fn dashboard_stats(db: &DbState) -> Result<DashboardStats, ApiError> {
    dashboard_stats_at(db, Local::now().fixed_offset()).await
}

/// Dashboard figures relative to `now`, bucketed by `now`'s offset.
pub async fn dashboard_stats_at(
    db: &DbState,
    now: DateTime<FixedOffset>,
) -> Result<DashboardStats, ApiError> {
    let since = window_start(now)?;
    debug!(since = %since, "dashboard_stats command");

    let bills = db.inner().ledger().bills_since(since).await?;
    Ok(compute_dashboard_stats(&bills, now))
}

/// Local midnight on the first day of the month before `now`, in UTC.
fn window_start(now: DateTime<FixedOffset>) -> Result<DateTime<Utc>, ApiError> {
    let (year, month) = previous_month(now.date_naive());

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|start| now.offset().from_local_datetime(&start).single())
        .map(|start| start.with_timezone(&Utc))
        .ok_or_else(|| ApiError::internal(format!("No calendar start for {}-{:02}", year, month)))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use clinic_core::{DispenseLine, Money, NewMedicine};
    use clinic_db::{Database, DbConfig};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 1800).unwrap()
    }

    #[test]
    fn test_window_start_is_local_midnight() {
        let now = ist().with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
        let start = window_start(now).unwrap();

        // 1 Dec 2025 00:00 IST
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 11, 30, 18, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_dashboard_counts_today() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let lot = db
            .inventory()
            .insert(&NewMedicine {
                name: "Dolo 650".to_string(),
                quantity: 10,
                cost_price_paise: 500,
                selling_price_paise: 800,
                expiry: None,
            })
            .await
            .unwrap();
        db.dispenser()
            .commit_dispense("9876543210", &[DispenseLine::from_lot(&lot, 3, None)])
            .await
            .unwrap();
        let db = DbState::new(db);

        let stats = dashboard_stats_at(&db, Utc::now().fixed_offset())
            .await
            .unwrap();

        assert_eq!(stats.today_patients, 1);
        assert_eq!(stats.today_income, Money::from_paise(2400));
        assert_eq!(stats.month_profit, Money::from_paise(900));

        let bills = list_bills(&db).await.unwrap();
        assert_eq!(bills.len(), 1);
        let bill = get_bill(&db, bills[0].id.clone()).await.unwrap();
        assert_eq!(bill.items.len(), 1);
        assert_eq!(patient_bills(&db, "98765-43210".to_string()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_bill() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let err = get_bill(&db, "missing".to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
