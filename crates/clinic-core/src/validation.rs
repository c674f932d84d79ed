//! # Validation Module
//!
//! Input validation for the dispensary.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Doctor panel                                                 │
//! │  ├── Required fields, numeric inputs                                   │
//! │  └── Immediate feedback                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: clinic-desk command                                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  └── NOT NULL / foreign keys                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use clinic_core::validation::{validate_phone, validate_quantity};
//!
//! // Patient key before a dispense
//! assert_eq!(validate_phone(" 98765 43210 ").unwrap(), "9876543210");
//!
//! // Quantity before adding to the cart
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::DispenseLine;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY, MAX_PRICE_PAISE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalizes a patient phone number.
///
/// ## Rules
/// - Must not be empty
/// - Spaces, dashes and brackets are stripped; a leading `+` is kept
/// - 7 to 15 digits remain (E.164 upper bound)
///
/// ## Returns
/// The normalized phone, used as the patient key everywhere.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "patient phone".to_string(),
        });
    }

    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "patient phone".to_string(),
                    reason: "must contain only digits".to_string(),
                })
            }
        }
    }

    if !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "patient phone".to_string(),
            reason: "must have between 7 and 15 digits".to_string(),
        });
    }

    Ok(format!("{plus}{digits}"))
}

/// Validates a medicine name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 120 characters
pub fn validate_medicine_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "medicine name".to_string(),
        });
    }

    if name.chars().count() > 120 {
        return Err(ValidationError::TooLong {
            field: "medicine name".to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Validates an inventory search query.
///
/// ## Returns
/// The trimmed query. Empty means "list everything".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a dispense quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ```text
/// Doctor types quantity: 5
///      │
///      ▼
/// validate_quantity(5)
///      ├── qty <= 0?   → "quantity must be positive"
///      ├── qty > 999?  → "quantity must be between 1 and 999"
///      └── OK          → line goes into the cart
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock level set by a direct inventory edit. Zero is allowed.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in paise. Zero is allowed (free samples), anything
/// above MAX_PRICE_PAISE is not.
///
/// ```rust
/// use clinic_core::validation::validate_price_paise;
/// use clinic_core::MAX_PRICE_PAISE;
///
/// assert!(validate_price_paise("selling price", 800).is_ok());
/// assert!(validate_price_paise("selling price", 0).is_ok());
/// assert!(validate_price_paise("selling price", -1).is_err());
/// assert!(validate_price_paise("selling price", MAX_PRICE_PAISE + 1).is_err());
/// ```
pub fn validate_price_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if paise > MAX_PRICE_PAISE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_PAISE,
        });
    }

    Ok(())
}

/// Validates a patient's age in years.
pub fn validate_age(age: u32) -> ValidationResult<()> {
    if age > 150 {
        return Err(ValidationError::OutOfRange {
            field: "age".to_string(),
            min: 0,
            max: 150,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a whole cart before it is committed.
///
/// ## Rules
/// - At least one line
/// - At most MAX_CART_LINES lines
/// - Every line references a lot, has a valid quantity and prices in range
///
/// Stock sufficiency is not checked here; that needs the stored lots.
pub fn validate_dispense_lines(lines: &[DispenseLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyPrescription);
    }

    if lines.len() > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }

    for line in lines {
        if line.lot_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "medicine".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
        validate_price_paise("cost price", line.cost_price_paise)?;
        validate_price_paise("selling price", line.selling_price_paise)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use clinic_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
