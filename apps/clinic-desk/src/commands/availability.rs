//! # Availability Commands
//!
//! The doctor's available/offline toggle.
//!
//! `set_availability` writes first and publishes only what was stored. A
//! failed write leaves subscribers on the previous value.

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{AvailabilityState, DbState};
use clinic_core::Availability;

/// Reads the stored status and republishes it.
pub async fn get_availability(
    db: &DbState,
    availability: &AvailabilityState,
) -> Result<Availability, ApiError> {
    debug!("get_availability command");
    let stored = db.inner().availability().get().await?;
    if stored != availability.current() {
        availability.publish(stored);
    }
    Ok(stored)
}

pub async fn set_availability(
    db: &DbState,
    availability: &AvailabilityState,
    online: bool,
) -> Result<Availability, ApiError> {
    debug!(online, "set_availability command");

    let stored = db.inner().availability().set(online).await?;
    availability.publish(stored);

    info!(online, "Availability changed");
    Ok(stored)
}

/// Subscribes to status changes. Drop the receiver to unsubscribe.
pub fn watch_availability(availability: &AvailabilityState) -> watch::Receiver<Availability> {
    debug!("watch_availability command");
    availability.subscribe()
}
