//! # Domain Types
//!
//! Core domain types used throughout the dispensary.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  MedicineLot    │   │  DispenseLine   │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  lot_id         │   │  id (UUID)      │       │
//! │  │  name           │   │  quantity       │──►│  items          │       │
//! │  │  quantity       │   │  price snapshot │   │  bill_total     │       │
//! │  │  cost / selling │   │  timings        │   │  profit         │       │
//! │  │  expiry?        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘            │                                      │
//! │                                 ▼                                      │
//! │                        ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │  Prescription   │   │    Patient      │       │
//! │                        │  items + dosage │   │  phone (key)    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Prices are copied from the lot into the [`DispenseLine`] when the doctor
//! adds it to the cart. Later edits to the lot never touch historical bills.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation;

// =============================================================================
// Expiry Month
// =============================================================================

/// Expiry of a medicine lot, precise to the month (`YYYY-MM`).
///
/// A lot expiring in `2026-03` is usable through 31 March 2026.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryMonth {
    year: i32,
    month: u32,
}

impl ExpiryMonth {
    /// Creates an expiry month, rejecting months outside 1-12.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::OutOfRange {
                field: "expiry month".to_string(),
                min: 1,
                max: 12,
            });
        }
        if !(2000..=9999).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "expiry year".to_string(),
                min: 2000,
                max: 9999,
            });
        }
        Ok(ExpiryMonth { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// True once `today` is past the last day of the expiry month.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        (today.year(), today.month()) > (self.year, self.month)
    }
}

impl fmt::Display for ExpiryMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ExpiryMonth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "expiry".to_string(),
            reason: "expected YYYY-MM".to_string(),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        ExpiryMonth::new(year, month)
    }
}

impl Serialize for ExpiryMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpiryMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Medicine Lot
// =============================================================================

/// A medicine stock record in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MedicineLot {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, e.g. "Dolo 650".
    pub name: String,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Unit cost in paise.
    pub cost_price_paise: i64,

    /// Default unit selling price in paise.
    pub selling_price_paise: i64,

    #[ts(as = "Option<String>")]
    pub expiry: Option<ExpiryMonth>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MedicineLot {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_paise(self.cost_price_paise)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_paise(self.selling_price_paise)
    }

    /// Checks whether `quantity` units can be taken from this lot.
    pub fn can_dispense(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.quantity
    }

    /// Stock is strictly below the threshold.
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity < threshold
    }
}

/// Input for the inventory-add action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicine {
    pub name: String,
    pub quantity: i64,
    pub cost_price_paise: i64,
    pub selling_price_paise: i64,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub expiry: Option<ExpiryMonth>,
}

impl NewMedicine {
    /// Validates the form: name required, quantity > 0, prices >= 0.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_medicine_name(&self.name)?;
        if self.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        validation::validate_price_paise("cost price", self.cost_price_paise)?;
        validation::validate_price_paise("selling price", self.selling_price_paise)?;
        Ok(())
    }
}

/// A direct inventory edit. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MedicineUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub cost_price_paise: Option<i64>,
    #[serde(default)]
    pub selling_price_paise: Option<i64>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub expiry: Option<ExpiryMonth>,
}

impl MedicineUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.cost_price_paise.is_none()
            && self.selling_price_paise.is_none()
            && self.expiry.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::validate_medicine_name(name)?;
        }
        if let Some(quantity) = self.quantity {
            validation::validate_stock_quantity(quantity)?;
        }
        if let Some(cost) = self.cost_price_paise {
            validation::validate_price_paise("cost price", cost)?;
        }
        if let Some(selling) = self.selling_price_paise {
            validation::validate_price_paise("selling price", selling)?;
        }
        Ok(())
    }

    /// Applies the set fields to `lot`. Does not touch timestamps.
    pub fn apply_to(&self, lot: &mut MedicineLot) {
        if let Some(name) = &self.name {
            lot.name = name.trim().to_string();
        }
        if let Some(quantity) = self.quantity {
            lot.quantity = quantity;
        }
        if let Some(cost) = self.cost_price_paise {
            lot.cost_price_paise = cost;
        }
        if let Some(selling) = self.selling_price_paise {
            lot.selling_price_paise = selling;
        }
        if let Some(expiry) = self.expiry {
            lot.expiry = Some(expiry);
        }
    }
}

// =============================================================================
// Dosage Metadata
// =============================================================================

/// Time of day a dose is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum DoseSlot {
    Morning,
    Afternoon,
    Night,
}

impl DoseSlot {
    pub const ALL: [DoseSlot; 3] = [DoseSlot::Morning, DoseSlot::Afternoon, DoseSlot::Night];

    pub fn label(&self) -> &'static str {
        match self {
            DoseSlot::Morning => "Morning",
            DoseSlot::Afternoon => "Afternoon",
            DoseSlot::Night => "Night",
        }
    }
}

/// Whether the dose is taken before or after food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum FoodInstruction {
    Before,
    After,
}

impl FoodInstruction {
    pub fn label(&self) -> &'static str {
        match self {
            FoodInstruction::Before => "Before",
            FoodInstruction::After => "After",
        }
    }
}

/// One timing entry on a prescription line, e.g. Morning, "1", After food.
///
/// Free-form metadata: never used in totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DoseTiming {
    pub slot: DoseSlot,
    /// Dose text such as "1/2", "1" or "2".
    pub dose: String,
    #[serde(default)]
    pub food: Option<FoodInstruction>,
}

impl DoseTiming {
    /// The default timing when a slot is ticked: one dose, after food.
    pub fn standard(slot: DoseSlot) -> Self {
        DoseTiming {
            slot,
            dose: "1".to_string(),
            food: Some(FoodInstruction::After),
        }
    }
}

// =============================================================================
// Dispense Line
// =============================================================================

/// One line of a prescription being built.
///
/// Prices are frozen at the moment the line is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DispenseLine {
    /// Lot this line dispenses from.
    pub lot_id: String,
    /// Medicine name at time of adding (frozen).
    pub name: String,
    /// Units to dispense. Must be positive.
    pub quantity: i64,
    /// Unit cost in paise at time of adding (frozen).
    pub cost_price_paise: i64,
    /// Unit selling price in paise at time of adding (frozen, may be custom).
    pub selling_price_paise: i64,
    #[serde(default)]
    pub timings: Vec<DoseTiming>,
}

impl DispenseLine {
    pub fn new(
        lot_id: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        cost_price_paise: i64,
        selling_price_paise: i64,
    ) -> Self {
        DispenseLine {
            lot_id: lot_id.into(),
            name: name.into(),
            quantity,
            cost_price_paise,
            selling_price_paise,
            timings: Vec::new(),
        }
    }

    /// Snapshots a lot into a line. `selling_price` overrides the lot's
    /// default price when the doctor types a custom one.
    pub fn from_lot(lot: &MedicineLot, quantity: i64, selling_price: Option<Money>) -> Self {
        DispenseLine {
            lot_id: lot.id.clone(),
            name: lot.name.clone(),
            quantity,
            cost_price_paise: lot.cost_price_paise,
            selling_price_paise: selling_price
                .map(|m| m.paise())
                .unwrap_or(lot.selling_price_paise),
            timings: Vec::new(),
        }
    }

    pub fn with_timings(mut self, timings: Vec<DoseTiming>) -> Self {
        self.timings = timings;
        self
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_paise(self.cost_price_paise)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_paise(self.selling_price_paise)
    }

    /// quantity × selling price.
    pub fn subtotal(&self) -> Money {
        self.selling_price().multiply_quantity(self.quantity)
    }

    /// quantity × (selling price − cost price). Negative when sold below cost.
    pub fn profit(&self) -> Money {
        (self.selling_price() - self.cost_price()).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A line on a bill, frozen at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub lot_id: String,
    pub name: String,
    pub quantity: i64,
    pub cost_price_paise: i64,
    pub selling_price_paise: i64,
    /// quantity × selling price.
    pub total_paise: i64,
}

impl BillItem {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }
}

/// An immutable bill created once per finalized prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub patient_phone: String,
    pub items: Vec<BillItem>,
    pub bill_total_paise: i64,
    pub profit_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Bill {
    #[inline]
    pub fn bill_total(&self) -> Money {
        Money::from_paise(self.bill_total_paise)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_paise(self.profit_paise)
    }
}

// =============================================================================
// Prescription
// =============================================================================

/// A prescription line: the bill snapshot plus dosage metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    pub lot_id: String,
    pub name: String,
    pub quantity: i64,
    pub cost_price_paise: i64,
    pub selling_price_paise: i64,
    pub total_paise: i64,
    pub timings: Vec<DoseTiming>,
}

/// An immutable record of the dispense event, kept for patient history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub patient_phone: String,
    pub items: Vec<PrescriptionItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Patient
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Single-letter form used in the share message.
    pub fn initial(&self) -> char {
        match self {
            Gender::Male => 'M',
            Gender::Female => 'F',
        }
    }
}

/// A patient, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub phone: String,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Gender,
    #[ts(as = "Option<String>")]
    pub last_visit: Option<DateTime<Utc>>,
}

impl Patient {
    /// A patient known only by phone.
    pub fn anonymous(phone: impl Into<String>) -> Self {
        Patient {
            phone: phone.into(),
            name: String::new(),
            age: None,
            gender: Gender::default(),
            last_visit: None,
        }
    }
}

// =============================================================================
// Availability
// =============================================================================

/// The doctor's available/offline status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub online: bool,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Availability {
    /// Status used when no record exists yet.
    pub fn offline() -> Self {
        Availability::default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
