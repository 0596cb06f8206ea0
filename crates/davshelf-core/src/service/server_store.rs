//! Server store - sole writer of WebDAV server definitions
//!
//! Every successful mutation reloads the server list from the repository,
//! republishes it to [`LiveList`] subscribers and emits a domain event.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{DomainEvent, WebDavServer};
use crate::error::{DavError, DavResult};
use crate::event_bus::EventSender;
use crate::live::LiveList;
use crate::repository::ServerRepository;

pub struct ServerStore {
    repository: Arc<dyn ServerRepository>,
    snapshot: watch::Sender<Arc<Vec<WebDavServer>>>,
    event_sender: EventSender,
}

impl ServerStore {
    pub fn new(repository: Arc<dyn ServerRepository>, event_sender: EventSender) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            repository,
            snapshot,
            event_sender,
        }
    }

    /// Live list of all servers.
    pub fn list_servers(&self) -> LiveList<WebDavServer> {
        LiveList::new(self.snapshot.subscribe())
    }

    /// Servers as last loaded.
    pub fn current(&self) -> Vec<WebDavServer> {
        self.snapshot.borrow().as_ref().clone()
    }

    /// Reload the snapshot from the repository.
    pub async fn refresh(&self) -> DavResult<()> {
        let servers = self
            .repository
            .list()
            .await
            .context("Failed to load servers")
            .map_err(DavError::persistence)?;
        debug!(count = servers.len(), "[ServerStore] Loaded servers");
        self.snapshot.send_replace(Arc::new(servers));
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DavResult<Option<WebDavServer>> {
        self.repository
            .get(id)
            .await
            .with_context(|| format!("Failed to load server {}", id))
            .map_err(DavError::persistence)
    }

    /// Insert a server, or overwrite the one with the same id.
    ///
    /// Emits: `ServerAdded`
    pub async fn add(&self, server: &WebDavServer) -> DavResult<()> {
        self.repository
            .upsert(server)
            .await
            .context("Failed to save server")
            .map_err(DavError::persistence)?;

        info!(
            server_id = %server.id,
            name = %server.name,
            "[ServerStore] Added server"
        );

        self.event_sender.emit(DomainEvent::ServerAdded {
            server_id: server.id.clone(),
            name: server.name.clone(),
        });
        self.republish().await;
        Ok(())
    }

    /// Replace a server by id. Returns false when the id is unknown.
    ///
    /// Emits: `ServerUpdated`
    pub async fn update(&self, server: &WebDavServer) -> DavResult<bool> {
        let updated = self
            .repository
            .update(server)
            .await
            .context("Failed to update server")
            .map_err(DavError::persistence)?;

        if !updated {
            debug!(server_id = %server.id, "[ServerStore] Update matched no server");
            return Ok(false);
        }

        info!(server_id = %server.id, "[ServerStore] Updated server");
        self.event_sender.emit(DomainEvent::ServerUpdated {
            server_id: server.id.clone(),
        });
        self.republish().await;
        Ok(true)
    }

    /// Delete a server. Returns false when the id is unknown.
    ///
    /// Emits: `ServerDeleted` when a row was removed
    pub async fn delete(&self, id: &str) -> DavResult<bool> {
        let deleted = self
            .repository
            .delete(id)
            .await
            .with_context(|| format!("Failed to delete server {}", id))
            .map_err(DavError::persistence)?;

        if !deleted {
            debug!(server_id = %id, "[ServerStore] Delete of unknown server ignored");
            return Ok(false);
        }

        info!(server_id = %id, "[ServerStore] Deleted server");
        self.event_sender.emit(DomainEvent::ServerDeleted {
            server_id: id.to_string(),
        });
        self.republish().await;
        Ok(true)
    }

    /// Persist a connection result. Returns false when the id is unknown.
    ///
    /// Emits: `ServerConnectionChanged`
    pub async fn set_connection_status(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> DavResult<bool> {
        let updated = self
            .repository
            .set_connection_status(id, connected, at)
            .await
            .context("Failed to save connection status")
            .map_err(DavError::persistence)?;

        if !updated {
            return Ok(false);
        }

        info!(
            server_id = %id,
            connected,
            "[ServerStore] Connection status changed"
        );
        self.event_sender.emit(DomainEvent::ServerConnectionChanged {
            server_id: id.to_string(),
            connected,
            at,
        });
        self.republish().await;
        Ok(true)
    }

    /// Servers whose name or url contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<WebDavServer> {
        self.snapshot
            .borrow()
            .iter()
            .filter(|s| s.matches_query(query))
            .cloned()
            .collect()
    }

    /// Reload after a committed write; failures are only logged.
    async fn republish(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "[ServerStore] Failed to reload servers after write");
        }
    }
}
