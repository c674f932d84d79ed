//! # Availability State
//!
//! Broadcasts the doctor's available/offline status to whoever is watching
//! (the patient-facing status badge, the doctor's toggle).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Availability Updates                                 │
//! │                                                                         │
//! │  set_availability(true)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  availability table ── write fails? ──► Err, nothing published         │
//! │       │                                                                 │
//! │       ▼ stored value                                                    │
//! │  watch::Sender ──────► Receiver (badge)                                │
//! │                  ├───► Receiver (toggle)                               │
//! │                  └───► ...                                             │
//! │                                                                         │
//! │  subscribe()  → new Receiver, sees the latest value immediately         │
//! │  drop(rx)     → unsubscribed                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use clinic_core::Availability;
use tokio::sync::watch;
use tracing::debug;

/// Shell-held availability observable.
#[derive(Debug)]
pub struct AvailabilityState {
    tx: watch::Sender<Availability>,
}

impl AvailabilityState {
    /// Starts from `initial`, normally the stored record.
    pub fn new(initial: Availability) -> Self {
        let (tx, _rx) = watch::channel(initial);
        AvailabilityState { tx }
    }

    /// Latest published value.
    pub fn current(&self) -> Availability {
        *self.tx.borrow()
    }

    /// Returns a receiver that yields every subsequent change. Dropping it
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Availability> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publishes a value that has already been persisted.
    pub fn publish(&self, availability: Availability) {
        debug!(
            online = availability.online,
            subscribers = self.tx.receiver_count(),
            "Publishing availability"
        );
        self.tx.send_replace(availability);
    }
}

impl Default for AvailabilityState {
    fn default() -> Self {
        Self::new(Availability::offline())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn online() -> Availability {
        Availability {
            online: true,
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_starts_offline() {
        let state = AvailabilityState::default();
        assert!(!state.current().online);
    }

    #[test]
    fn test_publish_without_subscribers_still_updates_current() {
        let state = AvailabilityState::default();
        state.publish(online());
        assert!(state.current().online);
    }

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let state = AvailabilityState::default();
        let mut rx = state.subscribe();
        assert!(!rx.borrow().online);

        state.publish(online());

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().online);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let state = AvailabilityState::default();
        let rx = state.subscribe();
        assert_eq!(state.subscriber_count(), 1);

        drop(rx);
        assert_eq!(state.subscriber_count(), 0);
    }
}
