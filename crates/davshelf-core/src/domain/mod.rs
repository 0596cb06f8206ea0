//! Domain entities, value objects, and events
//!
//! - Entities (WebDavServer, HistoryEntry)
//! - Value Objects (RemoteFile, HistoryWithServer)
//! - Domain Events (DomainEvent enum for event-driven updates)

mod event;
mod history;
mod remote_file;
mod server;

pub use event::DomainEvent;
pub use history::{HistoryEntry, HistoryWithServer};
pub use remote_file::RemoteFile;
pub use server::WebDavServer;
