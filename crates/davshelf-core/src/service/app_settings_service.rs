//! App Settings Service
//!
//! High-level service for managing application settings with typed access.
//! Provides convenient methods for common settings while using the repository
//! for persistence.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::service::HistoryConfig;
use crate::AppSettingsRepository;

// =============================================================================
// Setting Keys (centralized constants)
// =============================================================================

/// Setting key constants for type-safe access.
pub mod keys {
    /// History settings namespace
    pub mod history {
        /// Rows kept after eviction (usize)
        pub const MAX_ITEMS: &str = "history.max_items";
        /// Default length of the history list (usize)
        pub const LIST_LIMIT: &str = "history.list_limit";
        /// Default length of a per-server history list (usize)
        pub const SERVER_LIST_LIMIT: &str = "history.server_list_limit";
    }
}

// =============================================================================
// AppSettingsService
// =============================================================================

/// Service for managing application settings with typed access.
///
/// # Example
/// ```ignore
/// let service = AppSettingsService::new(repo);
///
/// service.set_history_max_items(200).await?;
/// let config = service.load_history_config().await;
/// ```
pub struct AppSettingsService {
    repository: Arc<dyn AppSettingsRepository>,
}

impl AppSettingsService {
    /// Create a new settings service with the given repository.
    pub fn new(repository: Arc<dyn AppSettingsRepository>) -> Self {
        Self { repository }
    }

    // =========================================================================
    // Generic typed access
    // =========================================================================

    /// Get a setting value parsed as the specified type.
    ///
    /// Returns `None` if the key doesn't exist or parsing fails.
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.repository.get(key).await {
            Ok(Some(value)) => {
                // JSON first, then as a bare string
                if let Ok(parsed) = serde_json::from_str(&value) {
                    return Some(parsed);
                }
                if let Ok(parsed) = serde_json::from_str(&format!("\"{}\"", value)) {
                    return Some(parsed);
                }
                warn!("[Settings] Failed to parse '{}' value: {}", key, value);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("[Settings] Failed to get '{}': {}", key, e);
                None
            }
        }
    }

    /// Get a setting value with a default if not set.
    pub async fn get_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_typed(key).await.unwrap_or(default)
    }

    /// Set a setting value, serializing it appropriately.
    pub async fn set_typed<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(value)?;
        let clean_value = serialized.trim_matches('"');
        self.repository.set(key, clean_value).await
    }

    /// Delete a setting.
    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.repository.delete(key).await
    }

    // =========================================================================
    // History settings
    // =========================================================================

    /// Rows kept after eviction.
    pub async fn get_history_max_items(&self) -> usize {
        self.get_or_default(keys::history::MAX_ITEMS, HistoryConfig::DEFAULT_MAX_ITEMS)
            .await
    }

    pub async fn set_history_max_items(&self, max_items: usize) -> anyhow::Result<()> {
        info!("[Settings] Setting history max items to {}", max_items);
        self.set_typed(keys::history::MAX_ITEMS, &max_items).await
    }

    pub async fn get_history_list_limit(&self) -> usize {
        self.get_or_default(keys::history::LIST_LIMIT, HistoryConfig::DEFAULT_LIST_LIMIT)
            .await
    }

    pub async fn set_history_list_limit(&self, limit: usize) -> anyhow::Result<()> {
        info!("[Settings] Setting history list limit to {}", limit);
        self.set_typed(keys::history::LIST_LIMIT, &limit).await
    }

    pub async fn get_history_server_list_limit(&self) -> usize {
        self.get_or_default(
            keys::history::SERVER_LIST_LIMIT,
            HistoryConfig::DEFAULT_SERVER_LIST_LIMIT,
        )
        .await
    }

    pub async fn set_history_server_list_limit(&self, limit: usize) -> anyhow::Result<()> {
        info!("[Settings] Setting per-server history list limit to {}", limit);
        self.set_typed(keys::history::SERVER_LIST_LIMIT, &limit).await
    }

    /// All history settings, falling back to defaults for missing or
    /// unparsable values.
    pub async fn load_history_config(&self) -> HistoryConfig {
        HistoryConfig {
            max_items: self.get_history_max_items().await,
            list_limit: self.get_history_list_limit().await,
            server_list_limit: self.get_history_server_list_limit().await,
        }
    }

    // =========================================================================
    // Utility methods
    // =========================================================================

    /// List all settings (for debugging/export).
    pub async fn list_all(&self) -> anyhow::Result<Vec<(String, String)>> {
        self.repository.list().await
    }

    /// List settings by namespace prefix.
    pub async fn list_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, String)>> {
        self.repository.list_by_prefix(prefix).await
    }
}
