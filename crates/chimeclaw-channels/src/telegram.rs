//! Telegram Bot channel — message sending via Bot API.

use async_trait::async_trait;
use chimeclaw_core::config::TelegramChannelConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Delivery;
use serde::Deserialize;

pub struct TelegramChannel {
    config: TelegramChannelConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

impl TelegramChannel {
    pub fn new(config: TelegramChannelConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{}",
            self.config.bot_token, method
        )
    }

    /// Send a plain-text message. Generated text is not valid Markdown in
    /// general, so no `parse_mode` is set.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ChimeClawError::Channel(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ChimeClawError::Channel(format!("Invalid send response: {e}")))?;

        if !result.ok {
            return Err(ChimeClawError::Channel(format!(
                "Send failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Delivery for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_to_recipient(&self, recipient_id: &str, text: &str) -> Result<()> {
        self.send_message(recipient_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let channel = TelegramChannel::new(TelegramChannelConfig {
            bot_token: "123:abc".into(),
        });
        assert_eq!(
            channel.api_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_error_response_parses() {
        let raw = r#"{"ok":false,"description":"Bad Request: chat not found"}"#;
        let resp: TelegramApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.description.as_deref(), Some("Bad Request: chat not found"));
    }
}
