//! Message store and chat-stream registry traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatStream, HistoricalMessage, RecalledMessage, StoredMessage};

/// Recalled-message records older than this (seconds) are purged.
pub const RECALL_RETENTION_SECS: f64 = 300.0;

/// Persistent store for message records.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Insert a message record.
    async fn insert(&self, message: &StoredMessage) -> Result<()>;

    /// The newest `limit` messages of a stream, newest first.
    async fn find_recent(&self, stream_id: &str, limit: usize) -> Result<Vec<HistoricalMessage>>;

    /// Record a recalled message.
    async fn store_recalled(&self, recalled: &RecalledMessage) -> Result<()>;

    /// Delete recalled records with `time < reference_time - RECALL_RETENTION_SECS`.
    /// Returns the number of deleted rows.
    async fn remove_recalled(&self, reference_time: f64) -> Result<usize>;
}

/// Resolves a (platform, user) pair to a stable conversation id.
#[async_trait]
pub trait ChatStreamRegistry: Send + Sync {
    /// Get or create the private stream for this user.
    async fn get_or_create(&self, platform: &str, user_id: &str, nickname: &str)
        -> Result<ChatStream>;

    /// Shorthand for the stream id only.
    async fn resolve(&self, platform: &str, user_id: &str) -> Result<String> {
        Ok(self.get_or_create(platform, user_id, "").await?.stream_id)
    }
}
