//! ChimeClaw configuration system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ChimeClawError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChimeClawConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub timed_messages: TimedMessagesConfig,
}

impl ChimeClawConfig {
    /// Load config from the default path (~/.chimeclaw/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChimeClawError::Config(format!("Failed to read config: {e}")))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ChimeClawError::Config(format!("Failed to parse config: {e}")))
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChimeClawError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the ChimeClaw home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chimeclaw")
    }
}

/// Bot identity and persona used when composing synthesis prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// The bot's own user id on the chat platform.
    #[serde(default)]
    pub self_id: String,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    #[serde(default = "default_personality")]
    pub personality: String,
    /// Platform used to resolve private chat streams.
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_nickname() -> String { "Chime".into() }
fn default_personality() -> String { "warm, curious and concise".into() }
fn default_platform() -> String { "qq".into() }

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            self_id: String::new(),
            nickname: default_nickname(),
            personality: default_personality(),
            platform: default_platform(),
        }
    }
}

/// Text generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's base URL when non-empty.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String { "openai".into() }
fn default_model() -> String { "gpt-4o-mini".into() }
fn default_temperature() -> f32 { 0.8 }
fn default_max_tokens() -> u32 { 512 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            endpoint: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Message store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String { "~/.chimeclaw/messages.db".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_storage_path() }
    }
}

impl StorageConfig {
    /// Storage path with `~` expanded.
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Delivery channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Which channel delivers scheduled messages: "onebot", "telegram", "webhook".
    #[serde(default = "default_channel_kind")]
    pub kind: String,
    #[serde(default)]
    pub onebot: Option<OneBotChannelConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramChannelConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookChannelConfig>,
}

fn default_channel_kind() -> String { "onebot".into() }

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: default_channel_kind(),
            onebot: None,
            telegram: None,
            webhook: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneBotChannelConfig {
    #[serde(default = "default_onebot_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: String,
}

fn default_onebot_endpoint() -> String { "http://127.0.0.1:5700".into() }

impl Default for OneBotChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_onebot_endpoint(),
            access_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChannelConfig {
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Timed message feature configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedMessagesConfig {
    #[serde(default)]
    pub enable: bool,
    /// "timer" (next-fire queue) or "poll" (whole-minute polling).
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Occurrences popped later than this are skipped instead of sent.
    #[serde(default = "default_late_grace_secs")]
    pub late_grace_secs: u64,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

fn default_mode() -> String { "timer".into() }
fn default_late_grace_secs() -> u64 { 60 }

impl Default for TimedMessagesConfig {
    fn default() -> Self {
        Self {
            enable: false,
            mode: default_mode(),
            late_grace_secs: default_late_grace_secs(),
            schedules: Vec::new(),
        }
    }
}

/// One configured schedule, as written in the config file.
///
/// Required fields are optional here so a single malformed entry can be
/// rejected at load time without failing the whole file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub user_id: Option<String>,
    pub message: Option<String>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub weekdays: Option<Vec<u32>>,
    pub dynamic: Option<bool>,
    pub context_size: Option<usize>,
}
