//! # Dashboard Statistics
//!
//! Date buckets over the bill list, evaluated in the clinic's local time.
//!
//! ```text
//! ┌───────────────┬───────────────────────────────────────────────┐
//! │ today         │ bills whose local date == today               │
//! │ this month    │ same local year and month as today            │
//! │ last month    │ previous month; January rolls back to the     │
//! │               │ previous year's December                      │
//! └───────────────┴───────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Bill;

/// Figures shown on the doctor's dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Bills created today (one bill per patient visit).
    pub today_patients: u32,
    pub today_income: Money,
    pub month_income: Money,
    pub last_month_income: Money,
    pub month_profit: Money,
}

/// The (year, month) before the one `date` falls in.
pub fn previous_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

/// Buckets `bills` relative to `now`. Bill timestamps are converted into
/// `now`'s offset before comparing dates.
pub fn compute_dashboard_stats<'a, I>(bills: I, now: DateTime<FixedOffset>) -> DashboardStats
where
    I: IntoIterator<Item = &'a Bill>,
{
    let offset = *now.offset();
    let today = now.date_naive();
    let this_month = (today.year(), today.month());
    let last_month = previous_month(today);

    let mut stats = DashboardStats::default();

    for bill in bills {
        let date = bill.created_at.with_timezone(&offset).date_naive();
        let month = (date.year(), date.month());

        if date == today {
            stats.today_patients += 1;
            stats.today_income += bill.bill_total();
        }
        if month == this_month {
            stats.month_income += bill.bill_total();
            stats.month_profit += bill.profit();
        } else if month == last_month {
            stats.last_month_income += bill.bill_total();
        }
    }

    stats
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 1800).unwrap()
    }

    fn bill_at(created_at: DateTime<Utc>, total: i64, profit: i64) -> Bill {
        Bill {
            id: "b".to_string(),
            patient_phone: "9876543210".to_string(),
            items: vec![],
            bill_total_paise: total,
            profit_paise: profit,
            created_at,
        }
    }

    #[test]
    fn test_buckets() {
        let now = ist().with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let bills = vec![
            bill_at(Utc.with_ymd_and_hms(2026, 3, 15, 4, 0, 0).unwrap(), 2400, 900),
            bill_at(Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap(), 1000, 100),
            bill_at(Utc.with_ymd_and_hms(2026, 2, 20, 4, 0, 0).unwrap(), 500, 50),
            bill_at(Utc.with_ymd_and_hms(2025, 3, 15, 4, 0, 0).unwrap(), 9999, 1),
        ];

        let stats = compute_dashboard_stats(&bills, now);
        assert_eq!(stats.today_patients, 1);
        assert_eq!(stats.today_income, Money::from_paise(2400));
        assert_eq!(stats.month_income, Money::from_paise(3400));
        assert_eq!(stats.month_profit, Money::from_paise(1000));
        assert_eq!(stats.last_month_income, Money::from_paise(500));
    }

    #[test]
    fn test_january_last_month_is_previous_december() {
        let now = ist().with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
        let bills = vec![
            bill_at(Utc.with_ymd_and_hms(2025, 12, 31, 4, 0, 0).unwrap(), 700, 0),
            bill_at(Utc.with_ymd_and_hms(2026, 12, 5, 4, 0, 0).unwrap(), 300, 0),
        ];

        let stats = compute_dashboard_stats(&bills, now);
        assert_eq!(stats.last_month_income, Money::from_paise(700));
        assert_eq!(previous_month(now.date_naive()), (2025, 12));
    }

    #[test]
    fn test_local_date_decides_today() {
        // 20:00 UTC on the 14th is 01:30 on the 15th in IST.
        let now = ist().with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        let bills = vec![bill_at(Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap(), 100, 0)];

        assert_eq!(compute_dashboard_stats(&bills, now).today_patients, 1);
    }

    #[test]
    fn test_no_bills() {
        let now = ist().with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(
            compute_dashboard_stats(std::iter::empty(), now),
            DashboardStats::default()
        );
    }
}
