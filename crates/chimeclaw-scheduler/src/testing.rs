//! In-crate fakes for the collaborator traits.

use async_trait::async_trait;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::{ChatStreamRegistry, Delivery, Generator, MessageStore};
use chimeclaw_core::types::{
    ChatStream, Completion, GenerateParams, HistoricalMessage, RecalledMessage, StoredMessage,
};
use std::collections::HashSet;
use std::sync::Mutex;

/// Returns a fixed history window, in the order given.
#[derive(Default)]
pub struct FakeStore {
    history: Vec<HistoricalMessage>,
    fail: bool,
}

impl FakeStore {
    pub fn with_history(rows: &[(f64, &str, &str)]) -> Self {
        Self {
            history: rows
                .iter()
                .map(|(timestamp, sender, text)| HistoricalMessage {
                    sender_id: sender.to_string(),
                    text: text.to_string(),
                    timestamp: *timestamp,
                })
                .collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self { history: Vec::new(), fail: true }
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    fn name(&self) -> &str { "fake" }

    async fn insert(&self, _message: &StoredMessage) -> Result<()> {
        Ok(())
    }

    async fn find_recent(&self, _stream_id: &str, limit: usize) -> Result<Vec<HistoricalMessage>> {
        if self.fail {
            return Err(ChimeClawError::Memory("store offline".into()));
        }
        Ok(self.history.iter().take(limit).cloned().collect())
    }

    async fn store_recalled(&self, _recalled: &RecalledMessage) -> Result<()> {
        Ok(())
    }

    async fn remove_recalled(&self, _reference_time: f64) -> Result<usize> {
        Ok(0)
    }
}

/// Stream id is `stream-{user_id}`.
#[derive(Default)]
pub struct FakeStreams {
    pub fail: bool,
}

#[async_trait]
impl ChatStreamRegistry for FakeStreams {
    async fn get_or_create(&self, platform: &str, user_id: &str, nickname: &str) -> Result<ChatStream> {
        if self.fail {
            return Err(ChimeClawError::Memory("registry offline".into()));
        }
        Ok(ChatStream {
            stream_id: format!("stream-{user_id}"),
            platform: platform.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            create_time: 0.0,
            last_active_time: 0.0,
        })
    }
}

pub struct FakeGenerator {
    reply: Option<String>,
    hang: bool,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self { reply: Some(text.to_string()), hang: false, prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { reply: None, hang: false, prompts: Mutex::new(Vec::new()) }
    }

    /// Never answers.
    pub fn hanging() -> Self {
        Self { reply: None, hang: true, prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    fn name(&self) -> &str { "fake" }

    async fn complete(&self, prompt: &str, _params: &GenerateParams) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.hang {
            std::future::pending::<()>().await;
        }
        match &self.reply {
            Some(text) => Ok(Completion { text: text.clone(), reasoning: Some("thinking".into()) }),
            None => Err(ChimeClawError::Provider("generator down".into())),
        }
    }
}

/// Records every delivery; fails for recipients listed in `fail_for`.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
    fail_for: HashSet<String>,
}

impl RecordingChannel {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for RecordingChannel {
    fn name(&self) -> &str { "recording" }

    async fn send_to_recipient(&self, recipient_id: &str, text: &str) -> Result<()> {
        if self.fail_for.contains(recipient_id) {
            return Err(ChimeClawError::Channel(format!("{recipient_id} unreachable")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }
}
