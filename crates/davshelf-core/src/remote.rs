//! Remote client port
//!
//! The WebDAV wire protocol (PROPFIND, GET, auth negotiation) lives outside
//! this crate. Stores and the facade only need a directory listing and a
//! reachability probe.

use async_trait::async_trait;

use crate::domain::{RemoteFile, WebDavServer};

/// Path listed when the caller does not name one.
pub const DEFAULT_REMOTE_PATH: &str = "/";

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// List the entries of `path` on `server`.
    async fn list_files(&self, server: &WebDavServer, path: &str) -> anyhow::Result<Vec<RemoteFile>>;

    /// Check whether `server` answers with the configured credentials.
    ///
    /// `Ok(false)` means the server answered but refused; transport problems
    /// are `Err`.
    async fn test_connection(&self, server: &WebDavServer) -> anyhow::Result<bool>;
}
