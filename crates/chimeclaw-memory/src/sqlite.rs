//! SQLite message store with chat-stream registry and recalled-message cleanup.

use async_trait::async_trait;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::memory::{ChatStreamRegistry, MessageStore, RECALL_RETENTION_SECS};
use chimeclaw_core::types::{
    ChatStream, HistoricalMessage, RecalledMessage, StoredMessage, unix_now,
};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::stream::private_stream_id;

fn db_err(e: impl std::fmt::Display) -> ChimeClawError {
    ChimeClawError::Memory(e.to_string())
}

pub struct SqliteMessageStore {
    conn: Mutex<Connection>,
}

impl SqliteMessageStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                message_id TEXT NOT NULL,
                time REAL NOT NULL,
                chat_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_nickname TEXT NOT NULL DEFAULT '',
                processed_plain_text TEXT NOT NULL DEFAULT '',
                detailed_plain_text TEXT NOT NULL DEFAULT '',
                memorized_times INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_messages_chat_time ON messages (chat_id, time);

            CREATE TABLE IF NOT EXISTS chat_streams (
                stream_id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                user_id TEXT NOT NULL,
                nickname TEXT NOT NULL DEFAULT '',
                create_time REAL NOT NULL,
                last_active_time REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recalled_messages (
                message_id TEXT NOT NULL,
                time REAL NOT NULL,
                stream_id TEXT NOT NULL
            );",
        )
        .map_err(db_err)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(db_err)
    }

    /// Total stored messages across all streams.
    pub fn message_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |r| r.get::<_, i64>(0))
            .map_err(db_err)?;
        Ok(n as usize)
    }

    /// Number of recalled-message records currently kept.
    pub fn recalled_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n = conn
            .query_row("SELECT COUNT(*) FROM recalled_messages", [], |r| r.get::<_, i64>(0))
            .map_err(db_err)?;
        Ok(n as usize)
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    fn name(&self) -> &str { "sqlite" }

    async fn insert(&self, message: &StoredMessage) -> Result<()> {
        let conn = self.lock()?;
        // Message row and stream activity land together or not at all.
        let tx = conn.unchecked_transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO messages (message_id, time, chat_id, platform, user_id, user_nickname,
                                   processed_plain_text, detailed_plain_text, memorized_times)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                message.message_id,
                message.time,
                message.stream_id,
                message.user.platform,
                message.user.user_id,
                message.user.nickname,
                message.processed_plain_text,
                message.detailed_plain_text,
                message.memorized_times,
            ],
        )
        .map_err(db_err)?;

        tx.execute(
            "UPDATE chat_streams SET last_active_time = MAX(last_active_time, ?2) WHERE stream_id = ?1",
            rusqlite::params![message.stream_id, message.time],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)
    }

    async fn find_recent(&self, stream_id: &str, limit: usize) -> Result<Vec<HistoricalMessage>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, processed_plain_text, time FROM messages
                 WHERE chat_id = ?1 ORDER BY time DESC LIMIT ?2",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(rusqlite::params![stream_id, limit as i64], |row| {
                Ok(HistoricalMessage {
                    sender_id: row.get(0)?,
                    text: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })
            .map_err(db_err)?;

        let messages = rows
            .filter_map(|r| match r {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!("⚠️ Skipping unreadable message row: {e}");
                    None
                }
            })
            .collect();
        Ok(messages)
    }

    async fn store_recalled(&self, recalled: &RecalledMessage) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO recalled_messages (message_id, time, stream_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![recalled.message_id, recalled.time, recalled.stream_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn remove_recalled(&self, reference_time: f64) -> Result<usize> {
        let conn = self.lock()?;
        let cutoff = reference_time - RECALL_RETENTION_SECS;
        let deleted = conn
            .execute(
                "DELETE FROM recalled_messages WHERE time < ?1",
                rusqlite::params![cutoff],
            )
            .map_err(db_err)?;
        if deleted > 0 {
            tracing::debug!("🧹 Removed {deleted} recalled message(s) older than {cutoff}");
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ChatStreamRegistry for SqliteMessageStore {
    async fn get_or_create(
        &self,
        platform: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<ChatStream> {
        let stream_id = private_stream_id(platform, user_id);
        let conn = self.lock()?;

        let existing = conn
            .query_row(
                "SELECT stream_id, platform, user_id, nickname, create_time, last_active_time
                 FROM chat_streams WHERE stream_id = ?1",
                rusqlite::params![stream_id],
                |row| {
                    Ok(ChatStream {
                        stream_id: row.get(0)?,
                        platform: row.get(1)?,
                        user_id: row.get(2)?,
                        nickname: row.get(3)?,
                        create_time: row.get(4)?,
                        last_active_time: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)?;

        if let Some(stream) = existing {
            return Ok(stream);
        }

        let now = unix_now();
        let stream = ChatStream {
            stream_id,
            platform: platform.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            create_time: now,
            last_active_time: now,
        };
        conn.execute(
            "INSERT OR IGNORE INTO chat_streams
             (stream_id, platform, user_id, nickname, create_time, last_active_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                stream.stream_id,
                stream.platform,
                stream.user_id,
                stream.nickname,
                stream.create_time,
                stream.last_active_time,
            ],
        )
        .map_err(db_err)?;
        tracing::debug!("💬 Created chat stream {} for {platform}:{user_id}", stream.stream_id);
        Ok(stream)
    }
}
