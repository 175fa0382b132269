//! Registry change events
//!
//! Both registries publish every committed mutation here. Subscribers (the
//! WebSocket gateway, tests) receive them in commit order.

use crate::connection::ConnectionDto;
use crate::profile::Profile;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// State change pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A connection was created or changed state
    ConnectionChanged { connection: ConnectionDto },
    /// A profile was created
    ProfileCreated { profile: Profile },
    /// A profile was updated in place
    ProfileUpdated { profile: Profile },
    /// A profile was removed
    ProfileDeleted { id: String },
}

/// Broadcast channel shared by the registries
#[derive(Debug, Clone)]
pub struct EventBus {
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    /// Subscribe to registry events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: RegistryEvent) {
        // Err only means nobody is listening right now
        if let Err(broadcast::error::SendError(event)) = self.event_tx.send(event) {
            trace!("No event subscribers, dropped {:?}", event);
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}
