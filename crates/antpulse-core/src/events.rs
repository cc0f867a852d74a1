//! Lifecycle event system.
//!
//! This module provides an event-based system for observing the connection
//! manager: transport and session transitions, device opens, and dropped
//! samples. Events are for observability only; samples themselves always
//! travel through a [`SampleChannel`](crate::SampleChannel).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use antpulse_types::DeviceKey;

/// Events emitted by the connection manager and its callbacks.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ManagerEvent {
    /// The USB transport was opened.
    TransportOpened { product_id: u16 },
    /// The USB transport could not be opened.
    TransportFailed { product_id: u16, error: String },
    /// The ANT node started.
    SessionStarted,
    /// The ANT node could not be created or started.
    SessionFailed { error: String },
    /// The ANT node was stopped.
    SessionStopped,
    /// A logical device was created.
    DeviceOpened { key: DeviceKey, simulated: bool },
    /// An open request was served from the registry.
    DeviceReused { key: DeviceKey },
    /// A sample was discarded because the consumer had not drained the slot.
    SampleDropped { key: DeviceKey },
}

/// Sender for manager events.
pub type EventSender = broadcast::Sender<ManagerEvent>;

/// Receiver for manager events.
pub type EventReceiver = broadcast::Receiver<ManagerEvent>;

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Event dispatcher for sending events to any number of observers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    ///
    /// Never blocks. Events sent with no subscribers are discarded.
    pub fn send(&self, event: ManagerEvent) {
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_without_receivers_is_silent() {
        let events = EventDispatcher::default();
        events.send(ManagerEvent::SessionStarted);
        assert_eq!(events.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_receives_events() {
        let events = EventDispatcher::new(4);
        let mut rx = events.subscribe();

        events.send(ManagerEvent::DeviceOpened {
            key: DeviceKey::new(7, 1),
            simulated: false,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ManagerEvent::DeviceOpened {
                key: DeviceKey::new(7, 1),
                simulated: false,
            }
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = ManagerEvent::SampleDropped {
            key: DeviceKey::new(3, 1),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"sample_dropped\""));
        assert!(json.contains("\"device_number\":3"));

        let back: ManagerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
