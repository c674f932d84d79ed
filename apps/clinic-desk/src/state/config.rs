//! # Configuration State
//!
//! Stores clinic configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CLINIC_*`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use clinic_core::share::{ClinicProfile, ShareTarget};
use clinic_core::DEFAULT_LOW_STOCK_THRESHOLD;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Clinic configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Clinic name (uppercased in the share message header)
    pub clinic_name: String,

    /// Doctor's display name, e.g. "Dr. Mehta"
    pub doctor_name: String,

    /// Dialling code prefixed to bare 10-digit phone numbers
    pub country_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Lots with fewer units than this are flagged as low stock
    pub low_stock_threshold: i64,

    /// Where the share link opens
    pub share_target: ShareTarget,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Clinic: "Clinic Dispensary", doctor "Doctor"
    /// - Country code: 91, currency ₹
    /// - Low stock below 5 units
    /// - Share link opens the web client
    fn default() -> Self {
        ConfigState {
            clinic_name: "Clinic Dispensary".to_string(),
            doctor_name: "Doctor".to_string(),
            country_code: "91".to_string(),
            currency_symbol: "₹".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            share_target: ShareTarget::Web,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CLINIC_NAME`: Clinic name
    /// - `CLINIC_DOCTOR`: Doctor's name
    /// - `CLINIC_COUNTRY_CODE`: Dialling code, e.g. "91"
    /// - `CLINIC_LOW_STOCK_THRESHOLD`: Low-stock cutoff in units
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(name) = lookup("CLINIC_NAME").filter(|v| !v.trim().is_empty()) {
            config.clinic_name = name.trim().to_string();
        }

        if let Some(doctor) = lookup("CLINIC_DOCTOR").filter(|v| !v.trim().is_empty()) {
            config.doctor_name = doctor.trim().to_string();
        }

        if let Some(code) = lookup("CLINIC_COUNTRY_CODE") {
            let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                warn!(value = %code, "Ignoring CLINIC_COUNTRY_CODE without digits");
            } else {
                config.country_code = digits;
            }
        }

        if let Some(raw) = lookup("CLINIC_LOW_STOCK_THRESHOLD") {
            match raw.trim().parse::<i64>() {
                Ok(threshold) if threshold >= 0 => config.low_stock_threshold = threshold,
                _ => warn!(value = %raw, "Ignoring invalid CLINIC_LOW_STOCK_THRESHOLD"),
            }
        }

        config
    }

    /// Clinic identity used by the share message.
    pub fn profile(&self) -> ClinicProfile {
        ClinicProfile {
            clinic_name: self.clinic_name.clone(),
            doctor_name: self.doctor_name.clone(),
            country_code: self.country_code.clone(),
        }
    }

    /// Formats a paise amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234), "₹12.34");
    /// ```
    pub fn format_currency(&self, paise: i64) -> String {
        format!(
            "{}{}{}.{:02}",
            if paise < 0 { "-" } else { "" },
            self.currency_symbol,
            (paise / 100).abs(),
            (paise % 100).abs()
        )
    }
}
