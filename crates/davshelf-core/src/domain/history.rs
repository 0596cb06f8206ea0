//! HistoryEntry entity - playback state for one remote file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RemoteFile, WebDavServer};

/// Playback history for a single file on a single server.
///
/// `(server_id, file_path)` is the natural key: at most one entry exists per
/// pair, and repeated plays refresh that entry instead of adding rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row identity (kept stable across merges)
    pub id: String,

    /// Owning server
    pub server_id: String,

    /// Server name at the time of the play
    pub server_name: String,

    /// Display file name
    pub file_name: String,

    /// Path as reported by the remote listing
    pub file_path: String,

    /// File size in bytes
    #[serde(default)]
    pub file_size: u64,

    /// When playback last started or was saved
    pub last_played: DateTime<Utc>,

    /// Media duration in milliseconds
    #[serde(default)]
    pub duration_ms: u64,

    /// Resume position in milliseconds
    #[serde(default)]
    pub position_ms: u64,

    pub mime_type: Option<String>,
}

impl HistoryEntry {
    /// Create a new entry played now.
    pub fn new(
        server_id: impl Into<String>,
        server_name: impl Into<String>,
        file_name: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            server_id: server_id.into(),
            server_name: server_name.into(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            file_size: 0,
            last_played: Utc::now(),
            duration_ms: 0,
            position_ms: 0,
            mime_type: None,
        }
    }

    /// Build an entry for a file picked from a server listing.
    pub fn from_remote_file(server: &WebDavServer, file: &RemoteFile) -> Self {
        let mut entry = Self::new(&server.id, &server.name, &file.name, &file.path);
        entry.file_size = file.size;
        entry.mime_type = file.mime_type.clone();
        entry
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_progress(mut self, position_ms: u64, duration_ms: u64) -> Self {
        self.position_ms = position_ms;
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_last_played(mut self, last_played: DateTime<Utc>) -> Self {
        self.last_played = last_played;
        self
    }

    /// Whether `other` refers to the same remote file.
    pub fn same_key(&self, other: &HistoryEntry) -> bool {
        self.server_id == other.server_id && self.file_path == other.file_path
    }

    /// Playback progress in `[0.0, 1.0]`, or `None` without a known duration.
    pub fn progress(&self) -> Option<f64> {
        if self.duration_ms == 0 {
            return None;
        }
        Some((self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0))
    }
}

/// A history row together with its server definition, if it still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryWithServer {
    pub history: HistoryEntry,
    pub server: Option<WebDavServer>,
}
