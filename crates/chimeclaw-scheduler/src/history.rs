//! History reader. Recent conversation window, oldest first.

use chimeclaw_core::error::Result;
use chimeclaw_core::traits::MessageStore;
use chimeclaw_core::types::HistoricalMessage;
use std::sync::Arc;

#[derive(Clone)]
pub struct HistoryReader {
    store: Arc<dyn MessageStore>,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// The newest `limit` messages of a conversation in ascending time order.
    ///
    /// The store answers newest-first; the window is reversed and then
    /// stable-sorted by timestamp, so the output is ordered no matter how the
    /// backend returned it. An empty conversation is `Ok(vec![])`.
    pub async fn fetch(&self, conversation_id: &str, limit: usize) -> Result<Vec<HistoricalMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut messages = self.store.find_recent(conversation_id, limit).await?;
        messages.truncate(limit);
        messages.reverse();
        messages.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(messages)
    }
}
