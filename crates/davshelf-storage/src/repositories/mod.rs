//! Repository implementations using SQLite.

mod app_settings_repository;
mod history_repository;
mod server_repository;

pub use app_settings_repository::SqliteAppSettingsRepository;
pub use history_repository::SqliteHistoryRepository;
pub use server_repository::SqliteServerRepository;

use chrono::{DateTime, Utc};

/// Timestamps are stored as epoch milliseconds.
fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Out-of-range values fall back to the epoch.
fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
