//! WebDavServer entity - a user-configured remote share

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WebDAV endpoint the user has added.
///
/// `url` carries scheme, authority and an optional base path
/// (e.g. `https://nas.local/remote.php/webdav`). History rows refer to a
/// server only through `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebDavServer {
    /// Unique identifier, generated at creation
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Share URL
    pub url: String,

    /// Login name (empty for anonymous shares)
    #[serde(default)]
    pub username: String,

    /// Password (encrypted at rest by the storage layer)
    #[serde(default)]
    pub password: String,

    /// Result of the last committed connection test
    #[serde(default)]
    pub is_connected: bool,

    /// When the last successful connection test was committed
    pub last_connected: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl WebDavServer {
    /// Create a new server definition with a fresh id.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            username: String::new(),
            password: String::new(),
            is_connected: false,
            last_connected: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Use a caller-controlled id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set login credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Whether the server requires a login.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    /// Case-insensitive match on name or url.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query) || self.url.to_lowercase().contains(&query)
    }
}
