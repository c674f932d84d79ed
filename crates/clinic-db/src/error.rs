//! # Database Error Types
//!
//! Error types for database operations and the dispense commit.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──────────────► DispenseError::Storage { stage, source }        │
//! │       │                (dispense commit only)                          │
//! │       ▼                                                                 │
//! │  ApiError (in clinic-desk) ← Serialized for the doctor panel           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use clinic_core::{CoreError, ValidationError};
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. negative stock).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt {entity} record {id}: {reason}")]
    CorruptRecord {
        entity: String,
        id: String,
        reason: String,
    },

    /// A business rule rejected the write (e.g. stock would go negative).
    #[error(transparent)]
    Rule(#[from] CoreError),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn corrupt(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        DbError::CorruptRecord {
            entity: entity.into(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Rule(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// DispenseError
// =============================================================================

/// The write step a dispense commit was on when storage failed.
///
/// Writes happen in this order inside one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    /// Reading current stock for the cart's lots.
    ReadStock,
    /// Opening the transaction.
    Begin,
    /// Recording the patient's visit.
    Patient,
    Prescription,
    Bill,
    Inventory,
    /// Committing the transaction.
    Commit,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommitStage::ReadStock => "stock read",
            CommitStage::Begin => "transaction start",
            CommitStage::Patient => "patient record",
            CommitStage::Prescription => "prescription",
            CommitStage::Bill => "bill",
            CommitStage::Inventory => "inventory update",
            CommitStage::Commit => "transaction commit",
        };
        f.write_str(label)
    }
}

/// Why a dispense commit failed.
///
/// ## Outcomes
/// ```text
/// ┌──────────────────────┬───────────────────────────────────────────────┐
/// │ Rejected             │ Invalid input, unknown lot, or not enough     │
/// │                      │ stock. Detected before any write.             │
/// │ StockConflict        │ Stock kept changing under concurrent          │
/// │                      │ dispenses; every attempt was rolled back.     │
/// │ Storage              │ SQLite failed at `stage`. The transaction     │
/// │                      │ was rolled back: no prescription, bill, or    │
/// │                      │ stock change from this call is stored.        │
/// └──────────────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(Debug, Error)]
pub enum DispenseError {
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error("Stock for {lot_id} changed during dispense; gave up after {attempts} attempts")]
    StockConflict { lot_id: String, attempts: u32 },

    #[error("Storage failed at {stage}: {source}")]
    Storage {
        stage: CommitStage,
        #[source]
        source: DbError,
    },
}

impl DispenseError {
    pub fn storage(stage: CommitStage) -> impl FnOnce(DbError) -> DispenseError {
        move |source| DispenseError::Storage { stage, source }
    }

    pub fn is_insufficient_stock(&self) -> bool {
        matches!(
            self,
            DispenseError::Rejected(CoreError::InsufficientStock { .. })
        )
    }
}

impl From<ValidationError> for DispenseError {
    fn from(err: ValidationError) -> Self {
        DispenseError::Rejected(CoreError::Validation(err))
    }
}

pub type DispenseResult<T> = Result<T, DispenseError>;

// =============================================================================
// Unit Tests
// =============================================================================
