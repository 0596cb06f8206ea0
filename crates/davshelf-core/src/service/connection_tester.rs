//! Connection tester - remote reachability probes
//!
//! Probes never write state. Each one gets a request id; a probe is current
//! while no newer probe for the same server has started, and only current
//! results are worth committing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::WebDavServer;
use crate::error::{DavError, DavResult};
use crate::remote::RemoteClient;

const MSG_SUCCESS: &str = "Connection successful!";
const MSG_FAILED: &str = "Connection failed";

/// Outcome of one tagged connection test.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionProbe {
    pub server_id: String,
    pub request_id: u64,
    pub outcome: DavResult<bool>,
}

impl ConnectionProbe {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Ok(true))
    }

    /// Text shown to the user for this outcome.
    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(true) => MSG_SUCCESS.to_string(),
            Ok(false) => MSG_FAILED.to_string(),
            Err(e) => e.message().to_string(),
        }
    }
}

pub struct ConnectionTester {
    client: Arc<dyn RemoteClient>,
    next_request_id: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
    in_flight: AtomicUsize,
}

impl ConnectionTester {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            next_request_id: AtomicU64::new(0),
            latest: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Ask the remote whether `server` is reachable.
    pub async fn test(&self, server: &WebDavServer) -> DavResult<bool> {
        let _busy = InFlight::enter(&self.in_flight);
        debug!(server_id = %server.id, url = %server.url, "[ConnectionTester] Testing connection");

        self.client.test_connection(server).await.map_err(|e| {
            warn!(server_id = %server.id, error = %e, "[ConnectionTester] Connection test failed");
            DavError::connection(e)
        })
    }

    /// Run a test tagged with a fresh request id.
    pub async fn probe(&self, server: &WebDavServer) -> ConnectionProbe {
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .await
            .insert(server.id.clone(), request_id);

        let outcome = self.test(server).await;
        ConnectionProbe {
            server_id: server.id.clone(),
            request_id,
            outcome,
        }
    }

    /// Whether no newer probe for the same server has started.
    pub async fn is_current(&self, probe: &ConnectionProbe) -> bool {
        self.latest.lock().await.get(&probe.server_id) == Some(&probe.request_id)
    }

    /// Whether any test is running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

/// Counts a running test until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
