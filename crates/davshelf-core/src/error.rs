//! Tagged failures surfaced to the presentation layer.
//!
//! Repositories and the remote client return `anyhow::Result`; stores and the
//! facade map those into [`DavError`] so callers can branch on the kind and
//! show the message.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DavError {
    /// Referenced server id does not exist
    #[error("Server not found: {0}")]
    NotFound(String),

    /// Remote probe or listing failed; message comes from the transport
    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    /// Storage operation failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

/// Discriminant of [`DavError`] for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ConnectionFailure,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::ConnectionFailure => "connection_failure",
            Self::PersistenceFailure => "persistence_failure",
        }
    }
}

impl DavError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            Self::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
        }
    }

    /// The raw message, without the kind prefix used by `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::ConnectionFailure(m) | Self::PersistenceFailure(m) => m,
        }
    }

    pub fn not_found(server_id: impl Into<String>) -> Self {
        Self::NotFound(server_id.into())
    }

    /// Wrap a transport error, keeping its full context chain.
    pub fn connection(err: anyhow::Error) -> Self {
        Self::ConnectionFailure(format!("{:#}", err))
    }

    /// Wrap a storage error, keeping its full context chain.
    pub fn persistence(err: anyhow::Error) -> Self {
        Self::PersistenceFailure(format!("{:#}", err))
    }
}

pub type DavResult<T> = Result<T, DavError>;
