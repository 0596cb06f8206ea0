//! # Davshelf Core Library
//!
//! Server and playback-history management for a media client that browses
//! WebDAV shares.
//!
//! ## Modules
//!
//! - `branding` - Product naming constants
//! - `domain` - Core entities (WebDavServer, HistoryEntry, RemoteFile) and events
//! - `error` - Tagged error surfaced to the presentation layer
//! - `repository` - Data access traits (persistence port)
//! - `remote` - WebDAV client trait (remote port)
//! - `service` - Stores, connection tester, URI resolver, settings
//! - `application` - Facade consumed by UI code
//! - `event_bus` - Central event distribution system
//! - `live` - Replay-latest reactive snapshots

pub mod application;
pub mod branding;
pub mod clock;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod live;
pub mod remote;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use domain::*;
pub use error::{DavError, DavResult, ErrorKind};
pub use repository::*;
pub use service::*;

pub use application::{WebDavAppService, WebDavAppServiceBuilder};
pub use clock::{Clock, SystemClock};
pub use event_bus::{create_shared_event_bus, EventBus, EventReceiver, EventSender, SharedEventBus};
pub use live::LiveList;
pub use remote::{RemoteClient, DEFAULT_REMOTE_PATH};
