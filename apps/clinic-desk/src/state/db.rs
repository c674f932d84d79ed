//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `clinic-db` contains a `SqlitePool` which
//! is inherently thread-safe. Multiple commands can execute queries
//! concurrently without explicit locking. Dispense commits serialize
//! themselves inside SQLite.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn search_inventory(
//!     db: &DbState,
//!     query: String,
//! ) -> Result<Vec<MedicineDto>, ApiError> {
//!     let lots = db.inner().inventory().search(&query, 20).await?;
//!     ...
//! }
//! ```

use clinic_db::Database;

/// Wrapper around `Database` held by the shell.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
