//! WebDAV Application Service
//!
//! Single entry point for UI code: reactive server and history lists, server
//! commands, connection tests, file listing and playback URI resolution.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::domain::{DomainEvent, HistoryEntry, HistoryWithServer, RemoteFile, WebDavServer};
use crate::error::{DavError, DavResult};
use crate::event_bus::{EventBus, EventReceiver, EventSender};
use crate::live::LiveList;
use crate::remote::RemoteClient;
use crate::repository::{HistoryRepository, ServerRepository};
use crate::service::{
    resolve_playback_uri, ConnectionProbe, ConnectionTester, HistoryConfig, HistoryStore,
    ServerStore,
};

/// Facade over the server and history stores
pub struct WebDavAppService {
    servers: ServerStore,
    history: HistoryStore,
    tester: ConnectionTester,
    remote: Arc<dyn RemoteClient>,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
    event_sender: EventSender,
}

impl WebDavAppService {
    pub fn new(
        server_repo: Arc<dyn ServerRepository>,
        history_repo: Arc<dyn HistoryRepository>,
        remote: Arc<dyn RemoteClient>,
        clock: Arc<dyn Clock>,
        history_config: HistoryConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let sender = event_bus.sender();
        Self {
            servers: ServerStore::new(server_repo, sender.clone()),
            history: HistoryStore::new(history_repo, clock.clone(), history_config, sender.clone()),
            tester: ConnectionTester::new(remote.clone()),
            remote,
            clock,
            event_bus,
            event_sender: sender,
        }
    }

    /// Load both snapshots from storage.
    pub async fn initialize(&self) -> DavResult<()> {
        self.servers.refresh().await?;
        self.history.refresh().await?;
        info!(
            servers = self.servers.current().len(),
            history = self.history.current().len(),
            "[WebDavAppService] Initialized"
        );
        Ok(())
    }

    /// Subscribe to domain events emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    // =========================================================================
    // Reactive reads
    // =========================================================================

    pub fn servers(&self) -> LiveList<WebDavServer> {
        self.servers.list_servers()
    }

    pub fn history(&self, limit: usize) -> LiveList<HistoryEntry> {
        self.history.list_all(limit)
    }

    pub fn history_by_server(&self, server_id: &str, limit: usize) -> LiveList<HistoryEntry> {
        self.history.list_by_server(server_id, limit)
    }

    /// History with the configured default length.
    pub fn all_history(&self) -> LiveList<HistoryEntry> {
        self.history.list_all(self.history.config().list_limit)
    }

    /// Per-server history with the configured default length.
    pub fn server_history(&self, server_id: &str) -> LiveList<HistoryEntry> {
        self.history
            .list_by_server(server_id, self.history.config().server_list_limit)
    }

    // =========================================================================
    // Servers
    // =========================================================================

    /// Add a server; an existing id is overwritten.
    pub async fn add_server(&self, server: &WebDavServer) -> DavResult<()> {
        self.servers.add(server).await
    }

    pub async fn update_server(&self, server: &WebDavServer) -> DavResult<()> {
        if self.servers.update(server).await? {
            Ok(())
        } else {
            Err(DavError::not_found(&server.id))
        }
    }

    /// Delete a server together with its history. Unknown ids are a no-op.
    pub async fn delete_server(&self, server_id: &str) -> DavResult<()> {
        if !self.servers.delete(server_id).await? {
            return Ok(());
        }
        // Storage cascades; this also clears repositories without foreign keys
        // and republishes the history snapshot.
        self.history.remove_by_server(server_id).await;
        Ok(())
    }

    /// Persist a connection status stamped with the current time.
    pub async fn update_connection_status(&self, server_id: &str, connected: bool) -> DavResult<()> {
        let now = self.clock.now();
        if self
            .servers
            .set_connection_status(server_id, connected, now)
            .await?
        {
            Ok(())
        } else {
            Err(DavError::not_found(server_id))
        }
    }

    pub async fn get_server(&self, server_id: &str) -> DavResult<Option<WebDavServer>> {
        self.servers.get_by_id(server_id).await
    }

    /// Servers whose name or url contains `query`, ignoring case.
    pub fn search_servers(&self, query: &str) -> Vec<WebDavServer> {
        self.servers.search(query)
    }

    /// List `path` on a stored server (use [`crate::DEFAULT_REMOTE_PATH`] for the share root).
    pub async fn get_server_files(&self, server_id: &str, path: &str) -> DavResult<Vec<RemoteFile>> {
        let server = self
            .servers
            .get_by_id(server_id)
            .await?
            .ok_or_else(|| DavError::not_found(server_id))?;

        debug!(server_id = %server_id, path = %path, "[WebDavAppService] Listing files");
        self.remote.list_files(&server, path).await.map_err(|e| {
            warn!(server_id = %server_id, path = %path, error = %e, "[WebDavAppService] Listing failed");
            DavError::connection(e)
        })
    }

    // =========================================================================
    // Connection tests
    // =========================================================================

    /// Test `server` and commit a successful, still-current result.
    pub async fn test_connection(&self, server: &WebDavServer) -> DavResult<bool> {
        self.test_connection_report(server).await.outcome
    }

    /// Like [`Self::test_connection`], keeping the request id for display.
    ///
    /// A failed commit after a successful probe turns the outcome into a
    /// persistence failure.
    ///
    /// Emits: `ConnectionTestFinished`, plus `ServerConnectionChanged` on commit
    pub async fn test_connection_report(&self, server: &WebDavServer) -> ConnectionProbe {
        let mut probe = self.tester.probe(server).await;
        let current = self.tester.is_current(&probe).await;

        self.event_sender.emit(DomainEvent::ConnectionTestFinished {
            server_id: probe.server_id.clone(),
            request_id: probe.request_id,
            success: probe.is_success(),
            message: probe.message(),
            current,
        });

        if !current {
            debug!(
                server_id = %probe.server_id,
                request_id = probe.request_id,
                "[WebDavAppService] Discarding superseded connection test"
            );
            return probe;
        }

        if probe.is_success() {
            let now = self.clock.now();
            match self.servers.set_connection_status(&server.id, true, now).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(server_id = %server.id, "[WebDavAppService] Tested server is not stored");
                }
                Err(e) => probe.outcome = Err(e),
            }
        }
        probe
    }

    /// Whether a connection test is running.
    pub fn is_testing(&self) -> bool {
        self.tester.is_busy()
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Record a play; see [`HistoryStore::record`].
    pub async fn add_history(&self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.history.record(entry).await
    }

    pub async fn update_history(&self, entry: &HistoryEntry) {
        self.history.update(entry).await
    }

    pub async fn delete_history(&self, history_id: &str) {
        self.history.remove(history_id).await
    }

    pub async fn delete_history_by_server(&self, server_id: &str) {
        self.history.remove_by_server(server_id).await
    }

    /// Keep the `max_items` most recent entries. Returns rows removed.
    pub async fn clean_old_history(&self, max_items: usize) -> u64 {
        self.history.evict(max_items).await
    }

    /// Returns rows removed.
    pub async fn delete_history_before(&self, before: DateTime<Utc>) -> u64 {
        self.history.remove_played_before(before).await
    }

    pub async fn history_count(&self) -> DavResult<u64> {
        self.history.count().await
    }

    /// Default-length history joined with current server definitions.
    pub fn history_with_servers(&self) -> Vec<HistoryWithServer> {
        let servers: HashMap<String, WebDavServer> = self
            .servers
            .current()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        self.all_history()
            .latest()
            .into_iter()
            .map(|history| {
                let server = servers.get(&history.server_id).cloned();
                HistoryWithServer { history, server }
            })
            .collect()
    }

    /// Absolute URI for `entry`, or `None` if its server no longer exists.
    pub async fn resolve_playback_uri(&self, entry: &HistoryEntry) -> DavResult<Option<String>> {
        let server = self.servers.get_by_id(&entry.server_id).await?;
        Ok(resolve_playback_uri(entry, server.as_ref()))
    }
}
