//! Repository traits for data access
//!
//! These traits define the interface for data storage without specifying
//! the implementation (SQLite, in-memory, etc.)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{HistoryEntry, WebDavServer};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// WebDAV server repository trait
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Get all servers, oldest first
    async fn list(&self) -> RepoResult<Vec<WebDavServer>>;

    /// Get a server by ID
    async fn get(&self, id: &str) -> RepoResult<Option<WebDavServer>>;

    /// Insert a server, or overwrite the row with the same ID in place.
    ///
    /// Must not delete the existing row: that would cascade to its history.
    async fn upsert(&self, server: &WebDavServer) -> RepoResult<()>;

    /// Replace a server. Returns false if no row matched.
    async fn update(&self, server: &WebDavServer) -> RepoResult<bool>;

    /// Delete a server and (through the schema) its history. Returns false
    /// if no row matched.
    async fn delete(&self, id: &str) -> RepoResult<bool>;

    /// Persist a connection test result. Returns false if no row matched.
    async fn set_connection_status(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

/// Playback history repository trait
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Insert a new entry
    async fn insert(&self, entry: &HistoryEntry) -> RepoResult<()>;

    /// Update an entry by ID
    async fn update(&self, entry: &HistoryEntry) -> RepoResult<()>;

    /// Delete an entry by ID
    async fn delete(&self, id: &str) -> RepoResult<()>;

    /// Delete every entry of a server
    async fn delete_by_server(&self, server_id: &str) -> RepoResult<()>;

    /// Get the entry for a (server, path) pair
    async fn get_by_key(&self, server_id: &str, file_path: &str)
        -> RepoResult<Option<HistoryEntry>>;

    /// Most recently played entries, newest first
    async fn list_recent(&self, limit: usize) -> RepoResult<Vec<HistoryEntry>>;

    /// Most recently played entries of one server, newest first
    async fn list_by_server(&self, server_id: &str, limit: usize)
        -> RepoResult<Vec<HistoryEntry>>;

    /// Total number of entries
    async fn count(&self) -> RepoResult<u64>;

    /// Keep the `limit` most recently played entries and delete the rest.
    ///
    /// Ties on `last_played` keep the later insertion. Returns rows removed.
    async fn keep_most_recent(&self, limit: usize) -> RepoResult<u64>;

    /// Delete entries last played before `before`. Returns rows removed.
    async fn delete_played_before(&self, before: DateTime<Utc>) -> RepoResult<u64>;
}

/// App settings repository trait
///
/// Simple key-value store with dot-notation keys (e.g. "history.max_items").
#[async_trait]
pub trait AppSettingsRepository: Send + Sync {
    /// Get a setting value by key
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    /// Set a setting value (insert or update)
    async fn set(&self, key: &str, value: &str) -> RepoResult<()>;

    /// Delete a setting by key
    async fn delete(&self, key: &str) -> RepoResult<()>;

    /// Get all settings (for export/debug)
    async fn list(&self) -> RepoResult<Vec<(String, String)>>;

    /// Get all settings with a given prefix (e.g., "history." returns all history settings)
    async fn list_by_prefix(&self, prefix: &str) -> RepoResult<Vec<(String, String)>>;
}
