//! Message, history and generation types shared across crates.

use serde::{Deserialize, Serialize};

/// Who sent a stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub platform: String,
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
}

impl UserInfo {
    pub fn new(platform: &str, user_id: &str, nickname: &str) -> Self {
        Self {
            platform: platform.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
        }
    }
}

/// A full message record as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub message_id: String,
    pub stream_id: String,
    /// Unix seconds.
    pub time: f64,
    pub user: UserInfo,
    pub processed_plain_text: String,
    #[serde(default)]
    pub detailed_plain_text: String,
    #[serde(default)]
    pub memorized_times: u32,
}

impl StoredMessage {
    pub fn to_historical(&self) -> HistoricalMessage {
        HistoricalMessage {
            sender_id: self.user.user_id.clone(),
            text: self.processed_plain_text.clone(),
            timestamp: self.time,
        }
    }
}

/// The slice of a stored message the scheduler reads back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMessage {
    pub sender_id: String,
    pub text: String,
    /// Unix seconds.
    pub timestamp: f64,
}

/// A message the user recalled (deleted) on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalledMessage {
    pub message_id: String,
    pub time: f64,
    pub stream_id: String,
}

/// A resolved conversation between the bot and one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStream {
    pub stream_id: String,
    pub platform: String,
    pub user_id: String,
    pub nickname: String,
    pub create_time: f64,
    pub last_active_time: f64,
}

/// Sampling parameters for one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            max_tokens: 512,
        }
    }
}

/// Output of a text generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    /// Auxiliary reasoning returned by reasoning models; never delivered.
    pub reasoning: Option<String>,
}

/// Current wall-clock time as fractional unix seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
