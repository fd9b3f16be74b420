//! OneBot v11 HTTP channel — private messages to QQ users.

use async_trait::async_trait;
use chimeclaw_core::config::OneBotChannelConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Delivery;
use serde::Deserialize;

pub struct OneBotChannel {
    config: OneBotChannelConfig,
    client: reqwest::Client,
}

/// Standard OneBot action response envelope.
#[derive(Debug, Deserialize)]
pub struct OneBotResponse {
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub wording: Option<String>,
}

impl OneBotChannel {
    pub fn new(config: OneBotChannelConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, action: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), action)
    }
}

/// Body for `send_private_msg`. QQ user ids are numeric.
pub fn private_msg_body(user_id: &str, text: &str) -> Result<serde_json::Value> {
    let user_id: i64 = user_id
        .trim()
        .parse()
        .map_err(|_| ChimeClawError::Channel(format!("Invalid QQ user id: '{user_id}'")))?;
    Ok(serde_json::json!({
        "user_id": user_id,
        "message": text,
        "auto_escape": true,
    }))
}

#[async_trait]
impl Delivery for OneBotChannel {
    fn name(&self) -> &str {
        "onebot"
    }

    async fn send_to_recipient(&self, recipient_id: &str, text: &str) -> Result<()> {
        let body = private_msg_body(recipient_id, text)?;
        let mut req = self
            .client
            .post(self.api_url("send_private_msg"))
            .json(&body)
            .timeout(std::time::Duration::from_secs(10));
        if !self.config.access_token.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.config.access_token));
        }

        let response = req
            .send()
            .await
            .map_err(|e| ChimeClawError::Channel(format!("send_private_msg failed: {e}")))?;

        let result: OneBotResponse = response
            .json()
            .await
            .map_err(|e| ChimeClawError::Channel(format!("Invalid OneBot response: {e}")))?;

        if result.status != "ok" || result.retcode != 0 {
            return Err(ChimeClawError::Channel(format!(
                "OneBot error {}: {}",
                result.retcode,
                result.wording.unwrap_or_default()
            )));
        }
        tracing::debug!("📨 OneBot private message sent to {recipient_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_msg_body() {
        let body = private_msg_body("123456", "Good morning!").unwrap();
        assert_eq!(body["user_id"], 123456);
        assert_eq!(body["message"], "Good morning!");
    }

    #[test]
    fn test_non_numeric_user_id_rejected() {
        assert!(private_msg_body("alice", "hi").is_err());
    }

    #[test]
    fn test_api_url_trims_slash() {
        let channel = OneBotChannel::new(OneBotChannelConfig {
            endpoint: "http://127.0.0.1:5700/".into(),
            access_token: String::new(),
        });
        assert_eq!(channel.api_url("send_private_msg"), "http://127.0.0.1:5700/send_private_msg");
    }
}
