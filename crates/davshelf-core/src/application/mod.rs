//! Application Services - Orchestration layer with event emission
//!
//! The facade sits between the presentation layer (screens, view models) and
//! the stores. It:
//!
//! 1. **Orchestrates** operations across the server and history stores
//! 2. **Commits** connection test results that are still current
//! 3. **Exposes** reactive lists and a single error type to the UI
//!
//! # Architecture
//!
//! ```text
//! Presentation Layer (view models)
//!         │
//!         ▼
//! ┌─────────────────────────────────────┐
//! │        WebDavAppService             │
//! │  ┌──────────────┬──────────────┐    │
//! │  │ ServerStore  │ HistoryStore │    │
//! │  ├──────────────┴──────────────┤    │
//! │  │ ConnectionTester            │    │
//! │  └─────────────┬───────────────┘    │
//! │                ▼                    │
//! │         ┌──────────┐                │
//! │         │Event Bus │                │
//! │         └──────────┘                │
//! └─────────────────────────────────────┘
//!         │
//!         ▼
//! Ports (repositories, remote client)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let service = WebDavAppServiceBuilder::new()
//!     .with_event_bus(event_bus)
//!     .with_server_repo(server_repo)
//!     .with_history_repo(history_repo)
//!     .with_remote_client(client)
//!     .with_history_config(settings.load_history_config().await)
//!     .build()?;
//! service.initialize().await?;
//! ```

mod webdav;

pub use webdav::WebDavAppService;

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::event_bus::EventBus;
use crate::remote::RemoteClient;
use crate::repository::*;
use crate::service::HistoryConfig;

/// Builder for the facade and its stores
pub struct WebDavAppServiceBuilder {
    event_bus: Option<Arc<EventBus>>,
    server_repo: Option<Arc<dyn ServerRepository>>,
    history_repo: Option<Arc<dyn HistoryRepository>>,
    remote_client: Option<Arc<dyn RemoteClient>>,
    clock: Option<Arc<dyn Clock>>,
    history_config: HistoryConfig,
}

impl WebDavAppServiceBuilder {
    pub fn new() -> Self {
        Self {
            event_bus: None,
            server_repo: None,
            history_repo: None,
            remote_client: None,
            clock: None,
            history_config: HistoryConfig::default(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_server_repo(mut self, repo: Arc<dyn ServerRepository>) -> Self {
        self.server_repo = Some(repo);
        self
    }

    pub fn with_history_repo(mut self, repo: Arc<dyn HistoryRepository>) -> Self {
        self.history_repo = Some(repo);
        self
    }

    pub fn with_remote_client(mut self, client: Arc<dyn RemoteClient>) -> Self {
        self.remote_client = Some(client);
        self
    }

    /// Defaults to [`SystemClock`]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_history_config(mut self, config: HistoryConfig) -> Self {
        self.history_config = config;
        self
    }

    /// Build the facade. Snapshots stay empty until `initialize()`.
    pub fn build(self) -> anyhow::Result<WebDavAppService> {
        let event_bus = self.event_bus.ok_or_else(|| anyhow::anyhow!("Event bus required"))?;
        let server_repo = self
            .server_repo
            .ok_or_else(|| anyhow::anyhow!("Server repository required"))?;
        let history_repo = self
            .history_repo
            .ok_or_else(|| anyhow::anyhow!("History repository required"))?;
        let remote_client = self
            .remote_client
            .ok_or_else(|| anyhow::anyhow!("Remote client required"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(WebDavAppService::new(
            server_repo,
            history_repo,
            remote_client,
            clock,
            self.history_config,
            event_bus,
        ))
    }
}

impl Default for WebDavAppServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
