//! History store - merge-on-write playback history with a size cap
//!
//! The store is the only writer of history rows. Each write runs under one
//! lock: look up by `(server_id, file_path)`, insert or merge, evict down to
//! `max_items`, then reload the snapshot. Write failures are logged and
//! swallowed; playback must never fail because history could not be saved.
//!
//! Per-server lists are loaded with their own query rather than cut from the
//! global snapshot, so a server whose rows fall outside the newest
//! `snapshot_limit` still shows its history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::domain::{DomainEvent, HistoryEntry};
use crate::error::{DavError, DavResult};
use crate::event_bus::EventSender;
use crate::live::LiveList;
use crate::repository::{HistoryRepository, RepoResult};

type Rows = Arc<Vec<HistoryEntry>>;

/// Rows published to the per-server lists of one server.
struct ServerRows {
    tx: Arc<watch::Sender<Rows>>,
    /// Largest limit any subscriber asked for
    limit: usize,
}

/// Size cap and default list lengths for playback history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Rows kept after eviction
    pub max_items: usize,
    /// Default length of the global history list
    pub list_limit: usize,
    /// Default length of a per-server history list
    pub server_list_limit: usize,
}

impl HistoryConfig {
    pub const DEFAULT_MAX_ITEMS: usize = 100;
    pub const DEFAULT_LIST_LIMIT: usize = 50;
    pub const DEFAULT_SERVER_LIST_LIMIT: usize = 20;

    /// Rows loaded into the shared snapshot behind the global lists.
    fn snapshot_limit(&self) -> usize {
        self.max_items
            .max(self.list_limit)
            .max(self.server_list_limit)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: Self::DEFAULT_MAX_ITEMS,
            list_limit: Self::DEFAULT_LIST_LIMIT,
            server_list_limit: Self::DEFAULT_SERVER_LIST_LIMIT,
        }
    }
}

pub struct HistoryStore {
    repository: Arc<dyn HistoryRepository>,
    clock: Arc<dyn Clock>,
    config: HistoryConfig,
    write_lock: Arc<Mutex<()>>,
    snapshot: watch::Sender<Rows>,
    server_rows: SyncMutex<HashMap<String, ServerRows>>,
    event_sender: EventSender,
}

impl HistoryStore {
    pub fn new(
        repository: Arc<dyn HistoryRepository>,
        clock: Arc<dyn Clock>,
        config: HistoryConfig,
        event_sender: EventSender,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            repository,
            clock,
            config,
            write_lock: Arc::new(Mutex::new(())),
            snapshot,
            server_rows: SyncMutex::new(HashMap::new()),
            event_sender,
        }
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Most recently played entries across all servers.
    pub fn list_all(&self, limit: usize) -> LiveList<HistoryEntry> {
        LiveList::with_view(self.snapshot.subscribe(), move |items: &[HistoryEntry]| {
            items.iter().take(limit).cloned().collect()
        })
    }

    /// Most recently played entries of one server.
    ///
    /// Starts from the matching rows of the global snapshot and is reloaded
    /// from the repository in the background, then after every write.
    pub fn list_by_server(&self, server_id: &str, limit: usize) -> LiveList<HistoryEntry> {
        let (tx, rx) = self.register_server_view(server_id, limit);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let repository = self.repository.clone();
                let write_lock = self.write_lock.clone();
                let server_id = server_id.to_string();
                let tx = tx.clone();
                handle.spawn(async move {
                    let _guard = write_lock.lock().await;
                    load_server_rows(repository.as_ref(), &server_id, limit, &tx).await;
                });
            }
            Err(_) => {
                debug!(server_id = %server_id, "[HistoryStore] No runtime, server list loads on next write");
            }
        }

        LiveList::with_view(rx, move |items: &[HistoryEntry]| {
            items.iter().take(limit).cloned().collect()
        })
    }

    /// Entries as last loaded, newest first.
    pub fn current(&self) -> Vec<HistoryEntry> {
        self.snapshot.borrow().as_ref().clone()
    }

    pub async fn count(&self) -> DavResult<u64> {
        self.repository
            .count()
            .await
            .context("Failed to count history")
            .map_err(DavError::persistence)
    }

    /// Reload the snapshot and every per-server list from the repository.
    pub async fn refresh(&self) -> DavResult<()> {
        let _guard = self.write_lock.lock().await;
        self.reload().await
    }

    async fn reload(&self) -> DavResult<()> {
        let entries = self
            .repository
            .list_recent(self.config.snapshot_limit())
            .await
            .context("Failed to load history")
            .map_err(DavError::persistence)?;
        debug!(count = entries.len(), "[HistoryStore] Loaded history");
        self.snapshot.send_replace(Arc::new(entries));

        for (server_id, tx, limit) in self.server_views() {
            load_server_rows(self.repository.as_ref(), &server_id, limit, &tx).await;
        }
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Record a play of `entry`.
    ///
    /// An existing row for the same `(server_id, file_path)` keeps its id and
    /// takes every other field from `entry`, with `last_played` set to now.
    /// Otherwise `entry` is inserted as given. Returns the stored row, or
    /// `None` if the write failed.
    ///
    /// Emits: `HistoryRecorded`, then `HistoryEvicted` if rows were dropped
    pub async fn record(&self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let _guard = self.write_lock.lock().await;

        let stored = match self.merge_or_insert(entry).await {
            Ok((stored, merged)) => {
                info!(
                    history_id = %stored.id,
                    server_id = %stored.server_id,
                    file_path = %stored.file_path,
                    merged,
                    "[HistoryStore] Recorded play"
                );
                self.event_sender.emit(DomainEvent::HistoryRecorded {
                    history_id: stored.id.clone(),
                    server_id: stored.server_id.clone(),
                    file_path: stored.file_path.clone(),
                    merged,
                });
                Some(stored)
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "[HistoryStore] Failed to record play");
                None
            }
        };

        if stored.is_some() {
            self.evict_locked(self.config.max_items).await;
        }
        self.republish().await;
        stored
    }

    /// Overwrite an entry by id without merging (resume position saves).
    ///
    /// Emits: `HistoryUpdated`
    pub async fn update(&self, entry: &HistoryEntry) {
        let _guard = self.write_lock.lock().await;
        match self.repository.update(entry).await {
            Ok(()) => {
                debug!(history_id = %entry.id, "[HistoryStore] Updated entry");
                self.event_sender.emit(DomainEvent::HistoryUpdated {
                    history_id: entry.id.clone(),
                });
            }
            Err(e) => {
                error!(history_id = %entry.id, error = %e, "[HistoryStore] Failed to update entry");
            }
        }
        self.republish().await;
    }

    /// Emits: `HistoryRemoved`
    pub async fn remove(&self, id: &str) {
        let _guard = self.write_lock.lock().await;
        match self.repository.delete(id).await {
            Ok(()) => {
                info!(history_id = %id, "[HistoryStore] Removed entry");
                self.event_sender.emit(DomainEvent::HistoryRemoved {
                    history_id: id.to_string(),
                });
            }
            Err(e) => {
                error!(history_id = %id, error = %e, "[HistoryStore] Failed to remove entry");
            }
        }
        self.republish().await;
    }

    /// Emits: `HistoryClearedForServer`
    pub async fn remove_by_server(&self, server_id: &str) {
        let _guard = self.write_lock.lock().await;
        match self.repository.delete_by_server(server_id).await {
            Ok(()) => {
                info!(server_id = %server_id, "[HistoryStore] Cleared server history");
                self.event_sender.emit(DomainEvent::HistoryClearedForServer {
                    server_id: server_id.to_string(),
                });
            }
            Err(e) => {
                error!(server_id = %server_id, error = %e, "[HistoryStore] Failed to clear server history");
            }
        }
        self.republish().await;
    }

    /// Delete entries last played before `before`. Returns rows removed.
    ///
    /// Emits: `HistoryEvicted` when anything was removed
    pub async fn remove_played_before(&self, before: DateTime<Utc>) -> u64 {
        let _guard = self.write_lock.lock().await;
        let removed = match self.repository.delete_played_before(before).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(before = %before, error = %e, "[HistoryStore] Failed to delete old history");
                0
            }
        };
        if removed > 0 {
            info!(removed, before = %before, "[HistoryStore] Deleted old history");
            self.event_sender
                .emit(DomainEvent::HistoryEvicted { removed });
        }
        self.republish().await;
        removed
    }

    /// Keep only the `max_items` most recently played entries. Returns rows
    /// removed.
    ///
    /// Emits: `HistoryEvicted` when anything was removed
    pub async fn evict(&self, max_items: usize) -> u64 {
        let _guard = self.write_lock.lock().await;
        let removed = self.evict_locked(max_items).await;
        self.republish().await;
        removed
    }

    // =========================================================================
    // Internals (callers hold `write_lock`)
    // =========================================================================

    async fn merge_or_insert(&self, entry: HistoryEntry) -> RepoResult<(HistoryEntry, bool)> {
        let existing = self
            .repository
            .get_by_key(&entry.server_id, &entry.file_path)
            .await
            .context("look up history entry")?;

        match existing {
            Some(existing) => {
                let merged = HistoryEntry {
                    id: existing.id,
                    last_played: self.clock.now(),
                    ..entry
                };
                self.repository
                    .update(&merged)
                    .await
                    .context("update history entry")?;
                Ok((merged, true))
            }
            None => {
                self.repository
                    .insert(&entry)
                    .await
                    .context("insert history entry")?;
                Ok((entry, false))
            }
        }
    }

    async fn evict_locked(&self, max_items: usize) -> u64 {
        let count = match self.repository.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "[HistoryStore] Failed to count history for eviction");
                return 0;
            }
        };
        if count <= max_items as u64 {
            return 0;
        }

        match self.repository.keep_most_recent(max_items).await {
            Ok(removed) => {
                info!(removed, max_items, "[HistoryStore] Evicted old history");
                if removed > 0 {
                    self.event_sender
                        .emit(DomainEvent::HistoryEvicted { removed });
                }
                removed
            }
            Err(e) => {
                warn!(max_items, error = %e, "[HistoryStore] Failed to evict old history");
                0
            }
        }
    }

    async fn republish(&self) {
        if let Err(e) = self.reload().await {
            warn!(error = %e, "[HistoryStore] Failed to reload history after write");
        }
    }

    /// Channel for `server_id`, seeded from the global snapshot on first use.
    ///
    /// Subscribes while the registry is locked so a concurrent reload never
    /// prunes the view before its first receiver exists.
    fn register_server_view(
        &self,
        server_id: &str,
        limit: usize,
    ) -> (Arc<watch::Sender<Rows>>, watch::Receiver<Rows>) {
        let mut views = self
            .server_rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let view = views.entry(server_id.to_string()).or_insert_with(|| {
            let seeded: Vec<HistoryEntry> = self
                .snapshot
                .borrow()
                .iter()
                .filter(|e| e.server_id == server_id)
                .cloned()
                .collect();
            let (tx, _) = watch::channel(Arc::new(seeded));
            ServerRows {
                tx: Arc::new(tx),
                limit,
            }
        });
        view.limit = view.limit.max(limit);
        (view.tx.clone(), view.tx.subscribe())
    }

    fn server_views(&self) -> Vec<(String, Arc<watch::Sender<Rows>>, usize)> {
        let mut views = self
            .server_rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Drop channels nobody listens to anymore
        views.retain(|_, view| view.tx.receiver_count() > 0);
        views
            .iter()
            .map(|(id, view)| (id.clone(), view.tx.clone(), view.limit))
            .collect()
    }
}

/// Load one server's rows and publish them if they changed.
async fn load_server_rows(
    repository: &dyn HistoryRepository,
    server_id: &str,
    limit: usize,
    tx: &watch::Sender<Rows>,
) {
    match repository.list_by_server(server_id, limit).await {
        Ok(entries) => {
            tx.send_if_modified(|current| {
                if current.as_slice() == entries.as_slice() {
                    return false;
                }
                *current = Arc::new(entries);
                true
            });
        }
        Err(e) => {
            warn!(server_id = %server_id, error = %e, "[HistoryStore] Failed to load server history");
        }
    }
}
