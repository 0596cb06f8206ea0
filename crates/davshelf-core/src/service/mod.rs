//! Domain services
//!
//! Business logic that operates on domain entities via repositories.

pub mod app_settings_service;
mod connection_tester;
mod history_store;
mod playback_uri;
mod server_store;

pub use app_settings_service::{keys, AppSettingsService};
pub use connection_tester::{ConnectionProbe, ConnectionTester};
pub use history_store::{HistoryConfig, HistoryStore};
pub use playback_uri::resolve_playback_uri;
pub use server_store::ServerStore;
