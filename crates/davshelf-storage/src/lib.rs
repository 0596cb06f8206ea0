//! Davshelf Storage Layer
//!
//! SQLite database with encrypted server passwords.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  WebDavAppService                    │
//! ├──────────────────────────────────────────────────────┤
//! │               Repository Traits                      │
//! │   (ServerRepository, HistoryRepository, Settings)    │
//! ├──────────────────────────────────────────────────────┤
//! │            SQLite Implementations                    │
//! │   (SqliteServerRepository, SqliteHistoryRepository)  │
//! ├──────────────────────────────────────────────────────┤
//! │         PasswordCipher (AES-256-GCM)                 │
//! ├──────────────────────────────────────────────────────┤
//! │          KeychainKeyProvider (OS keychain)           │
//! ├──────────────────────────────────────────────────────┤
//! │                   Database                           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use davshelf_storage::{
//!     default_database_path, Database, KeychainKeyProvider, MasterKeyProvider,
//!     PasswordCipher, SqliteHistoryRepository, SqliteServerRepository,
//! };
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let master_key = KeychainKeyProvider::new()?.get_or_create_key()?;
//! let cipher = Arc::new(PasswordCipher::new(&master_key)?);
//!
//! let path = default_database_path().ok_or_else(|| anyhow::anyhow!("No data dir"))?;
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//!
//! let servers = SqliteServerRepository::new(db.clone(), cipher);
//! let history = SqliteHistoryRepository::new(db);
//! ```

pub mod crypto;
mod database;
pub mod keychain;
mod repositories;

pub use crypto::{generate_master_key, PasswordCipher, KEY_SIZE};
pub use database::Database;
pub use keychain::{KeychainKeyProvider, MasterKeyProvider, MemoryKeyProvider};
pub use repositories::*;

use davshelf_core::branding;

/// Default database file name.
pub const DATABASE_FILE: &str = "davshelf.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join(branding::DATA_DIR_NAME).join(DATABASE_FILE))
}
