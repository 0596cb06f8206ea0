//! Mock repository implementations for testing
//!
//! In-memory implementations of the persistence and remote ports for fast,
//! isolated tests. Write failures can be switched on per repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Semaphore;

use davshelf_core::{
    AppSettingsRepository, Clock, HistoryEntry, HistoryRepository, RemoteClient, RemoteFile,
    RepoResult, ServerRepository, WebDavServer,
};

fn injected_failure(what: &str) -> anyhow::Error {
    anyhow::anyhow!("injected {} failure", what)
}

// ============================================================================
// MockServerRepository
// ============================================================================

/// Servers in insertion order.
#[derive(Default)]
pub struct MockServerRepository {
    servers: RwLock<Vec<WebDavServer>>,
    fail_writes: AtomicBool,
}

impl MockServerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(self, server: WebDavServer) -> Self {
        self.servers.write().unwrap().push(server);
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure("server write"));
        }
        Ok(())
    }
}

#[async_trait]
impl ServerRepository for MockServerRepository {
    async fn list(&self) -> RepoResult<Vec<WebDavServer>> {
        Ok(self.servers.read().unwrap().clone())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<WebDavServer>> {
        Ok(self
            .servers
            .read()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn upsert(&self, server: &WebDavServer) -> RepoResult<()> {
        self.check_writable()?;
        let mut servers = self.servers.write().unwrap();
        match servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => *existing = server.clone(),
            None => servers.push(server.clone()),
        }
        Ok(())
    }

    async fn update(&self, server: &WebDavServer) -> RepoResult<bool> {
        self.check_writable()?;
        let mut servers = self.servers.write().unwrap();
        match servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => {
                *existing = server.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> RepoResult<bool> {
        self.check_writable()?;
        let mut servers = self.servers.write().unwrap();
        let before = servers.len();
        servers.retain(|s| s.id != id);
        Ok(servers.len() < before)
    }

    async fn set_connection_status(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        self.check_writable()?;
        let mut servers = self.servers.write().unwrap();
        match servers.iter_mut().find(|s| s.id == id) {
            Some(server) => {
                server.is_connected = connected;
                server.last_connected = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// MockHistoryRepository
// ============================================================================

/// History rows tagged with an insertion counter, ordered like the SQLite
/// repository (`last_played` desc, newer insertion first).
#[derive(Default)]
pub struct MockHistoryRepository {
    rows: RwLock<Vec<(u64, HistoryEntry)>>,
    next_seq: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// All rows, most recent first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.sorted().into_iter().map(|(_, e)| e).collect()
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure("history write"));
        }
        Ok(())
    }

    fn sorted(&self) -> Vec<(u64, HistoryEntry)> {
        let mut rows = self.rows.read().unwrap().clone();
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.last_played
                .cmp(&a.last_played)
                .then_with(|| seq_b.cmp(seq_a))
        });
        rows
    }
}

#[async_trait]
impl HistoryRepository for MockHistoryRepository {
    async fn insert(&self, entry: &HistoryEntry) -> RepoResult<()> {
        self.check_writable()?;
        let mut rows = self.rows.write().unwrap();
        if rows.iter().any(|(_, e)| e.id == entry.id || e.same_key(entry)) {
            anyhow::bail!("UNIQUE constraint failed: webdav_history");
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) as u64;
        rows.push((seq, entry.clone()));
        Ok(())
    }

    async fn update(&self, entry: &HistoryEntry) -> RepoResult<()> {
        self.check_writable()?;
        let mut rows = self.rows.write().unwrap();
        if let Some((_, existing)) = rows.iter_mut().find(|(_, e)| e.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.check_writable()?;
        self.rows.write().unwrap().retain(|(_, e)| e.id != id);
        Ok(())
    }

    async fn delete_by_server(&self, server_id: &str) -> RepoResult<()> {
        self.check_writable()?;
        self.rows
            .write()
            .unwrap()
            .retain(|(_, e)| e.server_id != server_id);
        Ok(())
    }

    async fn get_by_key(&self, server_id: &str, file_path: &str) -> RepoResult<Option<HistoryEntry>> {
        let found = self
            .rows
            .read()
            .unwrap()
            .iter()
            .find(|(_, e)| e.server_id == server_id && e.file_path == file_path)
            .map(|(_, e)| e.clone());
        // Suspend between lookup and write like a real database round trip
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn list_recent(&self, limit: usize) -> RepoResult<Vec<HistoryEntry>> {
        Ok(self.snapshot().into_iter().take(limit).collect())
    }

    async fn list_by_server(&self, server_id: &str, limit: usize) -> RepoResult<Vec<HistoryEntry>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|e| e.server_id == server_id)
            .take(limit)
            .collect())
    }

    async fn count(&self) -> RepoResult<u64> {
        Ok(self.rows.read().unwrap().len() as u64)
    }

    async fn keep_most_recent(&self, limit: usize) -> RepoResult<u64> {
        self.check_writable()?;
        let keep: Vec<u64> = self.sorted().iter().take(limit).map(|(seq, _)| *seq).collect();
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|(seq, _)| keep.contains(seq));
        Ok((before - rows.len()) as u64)
    }

    async fn delete_played_before(&self, before: DateTime<Utc>) -> RepoResult<u64> {
        self.check_writable()?;
        let mut rows = self.rows.write().unwrap();
        let count = rows.len();
        rows.retain(|(_, e)| e.last_played >= before);
        Ok((count - rows.len()) as u64)
    }
}

// ============================================================================
// MockAppSettingsRepository
// ============================================================================

#[derive(Default)]
pub struct MockAppSettingsRepository {
    settings: RwLock<HashMap<String, String>>,
}

impl MockAppSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppSettingsRepository for MockAppSettingsRepository {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.settings.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.settings
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> RepoResult<()> {
        self.settings.write().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self) -> RepoResult<Vec<(String, String)>> {
        let mut items: Vec<_> = self
            .settings
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        items.sort();
        Ok(items)
    }

    async fn list_by_prefix(&self, prefix: &str) -> RepoResult<Vec<(String, String)>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }
}

// ============================================================================
// MockRemoteClient
// ============================================================================

/// Scripted WebDAV client.
///
/// Connection results are consumed in call order; when the script is empty
/// the default result is used. With a gate, every connection test waits for
/// a permit from [`MockRemoteClient::release`].
pub struct MockRemoteClient {
    listings: RwLock<HashMap<String, Vec<RemoteFile>>>,
    listing_error: RwLock<Option<String>>,
    scripted: Mutex<VecDeque<Result<bool, String>>>,
    default_result: RwLock<Result<bool, String>>,
    gate: Option<Semaphore>,
    test_calls: AtomicUsize,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
            listing_error: RwLock::new(None),
            scripted: Mutex::new(VecDeque::new()),
            default_result: RwLock::new(Ok(true)),
            gate: None,
            test_calls: AtomicUsize::new(0),
        }
    }

    /// Connection tests block until released.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_listing(self, path: &str, files: Vec<RemoteFile>) -> Self {
        self.listings
            .write()
            .unwrap()
            .insert(path.to_string(), files);
        self
    }

    pub fn fail_listings(&self, message: &str) {
        *self.listing_error.write().unwrap() = Some(message.to_string());
    }

    pub fn set_connection_result(&self, result: Result<bool, &str>) {
        *self.default_result.write().unwrap() = result.map_err(str::to_string);
    }

    /// Queue a result for the next connection test.
    pub fn script(&self, result: Result<bool, &str>) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(result.map_err(str::to_string));
    }

    /// Let `n` waiting connection tests finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Connection tests started so far.
    pub fn test_calls(&self) -> usize {
        self.test_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRemoteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteClient for MockRemoteClient {
    async fn list_files(&self, _server: &WebDavServer, path: &str) -> anyhow::Result<Vec<RemoteFile>> {
        if let Some(message) = self.listing_error.read().unwrap().clone() {
            anyhow::bail!(message);
        }
        Ok(self
            .listings
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn test_connection(&self, _server: &WebDavServer) -> anyhow::Result<bool> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_result.read().unwrap().clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        result.map_err(|message| anyhow::anyhow!(message))
    }
}

// ============================================================================
// ManualClock
// ============================================================================

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// A fixed, round starting point.
    pub fn at_epoch_offset(seconds: i64) -> Self {
        Self::new(DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        *now += by;
        *now
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// MockRepositories
// ============================================================================

/// Convenience struct holding all mock ports
pub struct MockRepositories {
    pub servers: Arc<MockServerRepository>,
    pub history: Arc<MockHistoryRepository>,
    pub settings: Arc<MockAppSettingsRepository>,
    pub remote: Arc<MockRemoteClient>,
}

impl MockRepositories {
    /// Create a fresh set of empty mocks
    pub fn new() -> Self {
        Self::with_remote(MockRemoteClient::new())
    }

    pub fn with_remote(remote: MockRemoteClient) -> Self {
        Self {
            servers: Arc::new(MockServerRepository::new()),
            history: Arc::new(MockHistoryRepository::new()),
            settings: Arc::new(MockAppSettingsRepository::new()),
            remote: Arc::new(remote),
        }
    }
}

impl Default for MockRepositories {
    fn default() -> Self {
        Self::new()
    }
}
