//! # Error Types
//!
//! Domain-specific error types for clinic-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  clinic-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations (stock, lookups)      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  clinic-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── DispenseError    - Outcome of a failed dispense commit            │
//! │                                                                         │
//! │  clinic-desk errors (app)                                              │
//! │  └── ApiError         - What the UI sees (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DispenseError → ApiError → UI     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A dispense line references a lot that does not exist.
    #[error("Medicine not found: {0}")]
    LotNotFound(String),

    /// Not enough stock to complete the dispense.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cart: Dolo 650 ×3, Dolo 650 ×4   (same lot twice)
    ///      │
    ///      ▼
    /// Net requested: 7, stock on hand: 5
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Dolo 650", available: 5, requested: 7 }
    /// ```
    /// `requested` is always the netted quantity for the lot, not a single line.
    #[error("Insufficient stock for {name} ({lot_id}): available {available}, requested {requested}")]
    InsufficientStock {
        lot_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Stock adjustment would drive a lot below zero.
    #[error("Stock for {lot_id} cannot go below zero (current {current}, change {delta})")]
    NegativeStock {
        lot_id: String,
        current: i64,
        delta: i64,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Prescription cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any computation or write happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid phone, invalid expiry).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The prescription cart has no lines.
    #[error("Prescription has no medicines")]
    EmptyPrescription,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            lot_id: "m1".to_string(),
            name: "Dolo 650".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Dolo 650 (m1): available 2, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "patient phone".to_string(),
        };
        assert_eq!(err.to_string(), "patient phone is required");
        assert_eq!(
            ValidationError::EmptyPrescription.to_string(),
            "Prescription has no medicines"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyPrescription.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
