//! Delivery channel trait.

use async_trait::async_trait;

use crate::error::Result;

/// A transport able to send text to a named recipient.
#[async_trait]
pub trait Delivery: Send + Sync {
    fn name(&self) -> &str;

    /// Send `text` to `recipient_id`. Failures are reported, never retried here.
    async fn send_to_recipient(&self, recipient_id: &str, text: &str) -> Result<()>;
}
