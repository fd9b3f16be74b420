//! Generic HTTP webhook channel. POSTs `{recipient, text, sent_at}` as JSON.

use async_trait::async_trait;
use chimeclaw_core::config::WebhookChannelConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Delivery;

pub struct WebhookChannel {
    config: WebhookChannelConfig,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookChannelConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

pub fn payload(recipient_id: &str, text: &str, sent_at: chrono::DateTime<chrono::Utc>) -> serde_json::Value {
    serde_json::json!({
        "recipient": recipient_id,
        "text": text,
        "sent_at": sent_at.to_rfc3339(),
    })
}

#[async_trait]
impl Delivery for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send_to_recipient(&self, recipient_id: &str, text: &str) -> Result<()> {
        let mut req = self
            .client
            .post(&self.config.url)
            .json(&payload(recipient_id, text, chrono::Utc::now()))
            .timeout(std::time::Duration::from_secs(10));

        for (key, value) in &self.config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ChimeClawError::Channel(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::debug!("🌐 Webhook delivered to {}", self.config.url);
            Ok(())
        } else {
            Err(ChimeClawError::Channel(format!("Webhook error {}", resp.status())))
        }
    }
}
