//! SQLite implementation of HistoryRepository.
//!
//! Recency order is `last_played DESC, seq DESC`: `seq` is the
//! autoincrement insertion counter, so equal timestamps keep the newer row.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use davshelf_core::{HistoryEntry, HistoryRepository};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;

use super::{from_millis, to_millis};
use crate::Database;

pub struct SqliteHistoryRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteHistoryRepository {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    const SELECT_COLUMNS: &'static str = "id, server_id, server_name, file_name, file_path, file_size, last_played, duration_ms, position_ms, mime_type";

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        let last_played: i64 = row.get(6)?;

        Ok(HistoryEntry {
            id: row.get(0)?,
            server_id: row.get(1)?,
            server_name: row.get(2)?,
            file_name: row.get(3)?,
            file_path: row.get(4)?,
            file_size: unsigned_column(row, 5)?,
            last_played: from_millis(last_played),
            duration_ms: unsigned_column(row, 7)?,
            position_ms: unsigned_column(row, 8)?,
            mime_type: row.get(9)?,
        })
    }
}

/// SQLite integers are signed; values above `i64::MAX` are rejected.
fn sql_integer(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{} {} out of range", column, value))
}

fn unsigned_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

#[async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    async fn insert(&self, entry: &HistoryEntry) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute(
            "INSERT INTO webdav_history (id, server_id, server_name, file_name, file_path, file_size, last_played, duration_ms, position_ms, mime_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id,
                entry.server_id,
                entry.server_name,
                entry.file_name,
                entry.file_path,
                sql_integer(entry.file_size, "file_size")?,
                to_millis(entry.last_played),
                sql_integer(entry.duration_ms, "duration_ms")?,
                sql_integer(entry.position_ms, "position_ms")?,
                entry.mime_type,
            ],
        )?;
        Ok(())
    }

    async fn update(&self, entry: &HistoryEntry) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let changed = conn.execute(
            "UPDATE webdav_history SET
                server_id = ?2, server_name = ?3, file_name = ?4, file_path = ?5, file_size = ?6,
                last_played = ?7, duration_ms = ?8, position_ms = ?9, mime_type = ?10
             WHERE id = ?1",
            params![
                entry.id,
                entry.server_id,
                entry.server_name,
                entry.file_name,
                entry.file_path,
                sql_integer(entry.file_size, "file_size")?,
                to_millis(entry.last_played),
                sql_integer(entry.duration_ms, "duration_ms")?,
                sql_integer(entry.position_ms, "position_ms")?,
                entry.mime_type,
            ],
        )?;

        if changed == 0 {
            debug!(history_id = %entry.id, "[SqliteHistoryRepository] Update matched no row");
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM webdav_history WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn delete_by_server(&self, server_id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "DELETE FROM webdav_history WHERE server_id = ?1",
            params![server_id],
        )?;
        Ok(())
    }

    async fn get_by_key(&self, server_id: &str, file_path: &str) -> Result<Option<HistoryEntry>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let entry = conn
            .query_row(
                &format!(
                    "SELECT {} FROM webdav_history WHERE server_id = ?1 AND file_path = ?2",
                    Self::SELECT_COLUMNS
                ),
                params![server_id, file_path],
                Self::map_row,
            )
            .optional()?;
        Ok(entry)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM webdav_history ORDER BY last_played DESC, seq DESC LIMIT ?1",
            Self::SELECT_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![limit as i64], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn list_by_server(&self, server_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM webdav_history WHERE server_id = ?1
             ORDER BY last_played DESC, seq DESC LIMIT ?2",
            Self::SELECT_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![server_id, limit as i64], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn count(&self) -> Result<u64> {
        let db = self.db.lock().await;
        let count: i64 =
            db.connection()
                .query_row("SELECT COUNT(*) FROM webdav_history", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn keep_most_recent(&self, limit: usize) -> Result<u64> {
        let db = self.db.lock().await;
        let removed = db.connection().execute(
            "DELETE FROM webdav_history WHERE seq NOT IN (
                SELECT seq FROM webdav_history ORDER BY last_played DESC, seq DESC LIMIT ?1
             )",
            params![limit as i64],
        )?;
        Ok(removed as u64)
    }

    async fn delete_played_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let db = self.db.lock().await;
        let removed = db.connection().execute(
            "DELETE FROM webdav_history WHERE last_played < ?1",
            params![to_millis(before)],
        )?;
        Ok(removed as u64)
    }
}
