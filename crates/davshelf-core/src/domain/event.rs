//! Domain Events - change notifications for servers and playback history
//!
//! Events are emitted by the stores after a mutation has been persisted and
//! consumed by whoever subscribes to the event bus (UI bridge, audit log).
//!
//! # Design Principles
//!
//! - **Facts only**: an event describes something that already happened
//! - **Ids, not entities**: payloads carry identifiers; consumers re-read state
//! - **Serializable**: events serialize with a snake_case `type` tag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every observable change in the server/history subsystem.
///
/// # Serialization
///
/// ```json
/// { "type": "server_added", "server_id": "...", "name": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    // ════════════════════════════════════════════════════════════════════════
    // SERVERS
    // ════════════════════════════════════════════════════════════════════════

    /// A server definition was added (or overwritten by id)
    ServerAdded {
        server_id: String,
        name: String,
    },

    /// A server definition was replaced
    ServerUpdated {
        server_id: String,
    },

    /// A server and its history were deleted
    ServerDeleted {
        server_id: String,
    },

    /// Persisted connection status changed
    ServerConnectionChanged {
        server_id: String,
        connected: bool,
        at: DateTime<Utc>,
    },

    /// A connection probe completed
    ConnectionTestFinished {
        server_id: String,
        /// Monotonic id used to discard superseded results
        request_id: u64,
        success: bool,
        message: String,
        /// False when a newer probe for the same server had already started
        current: bool,
    },

    // ════════════════════════════════════════════════════════════════════════
    // HISTORY
    // ════════════════════════════════════════════════════════════════════════

    /// A play was recorded (new row, or merged into the existing one)
    HistoryRecorded {
        history_id: String,
        server_id: String,
        file_path: String,
        merged: bool,
    },

    /// A history row was updated in place
    HistoryUpdated {
        history_id: String,
    },

    /// A history row was removed by the user
    HistoryRemoved {
        history_id: String,
    },

    /// All history for a server was removed
    HistoryClearedForServer {
        server_id: String,
    },

    /// Old rows were evicted by size or age
    HistoryEvicted {
        removed: u64,
    },
}

impl DomainEvent {
    /// Get the event type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ServerAdded { .. } => "server_added",
            Self::ServerUpdated { .. } => "server_updated",
            Self::ServerDeleted { .. } => "server_deleted",
            Self::ServerConnectionChanged { .. } => "server_connection_changed",
            Self::ConnectionTestFinished { .. } => "connection_test_finished",
            Self::HistoryRecorded { .. } => "history_recorded",
            Self::HistoryUpdated { .. } => "history_updated",
            Self::HistoryRemoved { .. } => "history_removed",
            Self::HistoryClearedForServer { .. } => "history_cleared_for_server",
            Self::HistoryEvicted { .. } => "history_evicted",
        }
    }

    /// Get the server_id if this event is server-scoped
    pub fn server_id(&self) -> Option<&str> {
        match self {
            Self::ServerAdded { server_id, .. }
            | Self::ServerUpdated { server_id }
            | Self::ServerDeleted { server_id }
            | Self::ServerConnectionChanged { server_id, .. }
            | Self::ConnectionTestFinished { server_id, .. }
            | Self::HistoryRecorded { server_id, .. }
            | Self::HistoryClearedForServer { server_id } => Some(server_id),
            Self::HistoryUpdated { .. }
            | Self::HistoryRemoved { .. }
            | Self::HistoryEvicted { .. } => None,
        }
    }

    /// Whether this event changes what the history list shows
    pub fn affects_history(&self) -> bool {
        matches!(
            self,
            Self::ServerDeleted { .. }
                | Self::HistoryRecorded { .. }
                | Self::HistoryUpdated { .. }
                | Self::HistoryRemoved { .. }
                | Self::HistoryClearedForServer { .. }
                | Self::HistoryEvicted { .. }
        )
    }
}
