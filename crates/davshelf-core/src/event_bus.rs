//! Event Bus - Central event distribution system
//!
//! Stores emit a [`DomainEvent`] after every persisted change; the UI bridge
//! and any other consumer subscribe independently.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              Event Bus (broadcast channel)               │
//! │                                                          │
//! │  Producers:                 Consumers:                   │
//! │  ├─ ServerStore             ├─ UI bridge                 │
//! │  ├─ HistoryStore            └─ Audit log / diagnostics   │
//! │  └─ WebDavAppService                                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The bus carries change notifications only. Current state (server and
//! history lists) is exposed through [`crate::LiveList`] snapshots, which a
//! late subscriber can read immediately; a late bus subscriber only sees
//! events emitted after it subscribed.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::DomainEvent;

/// Default channel capacity for the event bus
const DEFAULT_CAPACITY: usize = 256;

/// Central hub for domain event distribution.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Get a sender for emitting events
    pub fn sender(&self) -> EventSender {
        EventSender::new(self.sender.clone())
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Used by stores to emit domain events. Cheap to clone.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventSender {
    fn new(sender: broadcast::Sender<DomainEvent>) -> Self {
        Self { sender }
    }

    /// Emit a domain event
    ///
    /// Returns the number of receivers; 0 when nobody listens (not an error).
    pub fn emit(&self, event: DomainEvent) -> usize {
        let type_name = event.type_name();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(
                    event_type = type_name,
                    receivers = count,
                    "[EventBus] Emitted event"
                );
                count
            }
            Err(_) => {
                debug!(event_type = type_name, "[EventBus] No receivers for event");
                0
            }
        }
    }

    /// Check if there are any subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Used by consumers to receive domain events.
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<DomainEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event
    ///
    /// Returns `None` once the channel is closed. Lag is logged and skipped.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "[EventBus] Receiver lagged, skipped {} events",
                        skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("[EventBus] Channel closed");
                    return None;
                }
            }
        }
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(
                    skipped_events = skipped,
                    "[EventBus] Receiver lagged on try_recv"
                );
                self.receiver.try_recv().ok()
            }
            Err(_) => None,
        }
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Shared event bus for application-wide use
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_shared_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}
