//! SQLite implementation of ServerRepository.
//!
//! Passwords are sealed with [`PasswordCipher`] on the way in and opened on
//! the way out; every other column is plaintext.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use davshelf_core::{ServerRepository, WebDavServer};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;

use super::{from_millis, to_millis};
use crate::crypto::PasswordCipher;
use crate::Database;

/// Row as stored, password still sealed.
struct RawServerRow {
    id: String,
    name: String,
    url: String,
    username: String,
    password_enc: String,
    is_connected: bool,
    last_connected: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

/// SQLite-backed server repository.
pub struct SqliteServerRepository {
    db: Arc<Mutex<Database>>,
    cipher: Arc<PasswordCipher>,
}

impl SqliteServerRepository {
    pub fn new(db: Arc<Mutex<Database>>, cipher: Arc<PasswordCipher>) -> Self {
        Self { db, cipher }
    }

    const SELECT_COLUMNS: &'static str =
        "id, name, url, username, password_enc, is_connected, last_connected, created_at, updated_at";

    fn extract_row(row: &rusqlite::Row) -> rusqlite::Result<RawServerRow> {
        Ok(RawServerRow {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            username: row.get(3)?,
            password_enc: row.get(4)?,
            is_connected: row.get(5)?,
            last_connected: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn build_server(&self, row: RawServerRow) -> Result<WebDavServer> {
        let password = self
            .cipher
            .open(&row.password_enc)
            .with_context(|| format!("Failed to decrypt password of server {}", row.id))?;

        Ok(WebDavServer {
            id: row.id,
            name: row.name,
            url: row.url,
            username: row.username,
            password,
            is_connected: row.is_connected,
            last_connected: row.last_connected.map(from_millis),
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        })
    }
}

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn list(&self) -> Result<Vec<WebDavServer>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM webdav_servers ORDER BY created_at, rowid",
            Self::SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::extract_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|r| self.build_server(r)).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<WebDavServer>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let row = conn
            .query_row(
                &format!("SELECT {} FROM webdav_servers WHERE id = ?1", Self::SELECT_COLUMNS),
                params![id],
                Self::extract_row,
            )
            .optional()?;

        row.map(|r| self.build_server(r)).transpose()
    }

    async fn upsert(&self, server: &WebDavServer) -> Result<()> {
        let password_enc = self.cipher.seal(&server.password)?;
        let db = self.db.lock().await;
        let conn = db.connection();

        // In-place update on conflict; REPLACE would delete the row and cascade
        conn.execute(
            "INSERT INTO webdav_servers (id, name, url, username, password_enc, is_connected, last_connected, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                username = excluded.username,
                password_enc = excluded.password_enc,
                is_connected = excluded.is_connected,
                last_connected = excluded.last_connected,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            params![
                server.id,
                server.name,
                server.url,
                server.username,
                password_enc,
                server.is_connected,
                server.last_connected.map(to_millis),
                to_millis(server.created_at),
                to_millis(server.updated_at),
            ],
        )?;

        debug!(server_id = %server.id, "[SqliteServerRepository] Upserted server");
        Ok(())
    }

    async fn update(&self, server: &WebDavServer) -> Result<bool> {
        let password_enc = self.cipher.seal(&server.password)?;
        let db = self.db.lock().await;
        let conn = db.connection();

        let changed = conn.execute(
            "UPDATE webdav_servers SET
                name = ?2, url = ?3, username = ?4, password_enc = ?5,
                is_connected = ?6, last_connected = ?7, created_at = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                server.id,
                server.name,
                server.url,
                server.username,
                password_enc,
                server.is_connected,
                server.last_connected.map(to_millis),
                to_millis(server.created_at),
                to_millis(server.updated_at),
            ],
        )?;

        Ok(changed > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let changed = conn.execute("DELETE FROM webdav_servers WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    async fn set_connection_status(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let changed = conn.execute(
            "UPDATE webdav_servers SET is_connected = ?2, last_connected = ?3 WHERE id = ?1",
            params![id, connected, to_millis(at)],
        )?;

        Ok(changed > 0)
    }
}
