//! Unified OpenAI-compatible generator.
//!
//! One struct handles chat completions for every OpenAI-compatible API.
//! Backends are distinguished only by endpoint URL, auth style, and API key.

use async_trait::async_trait;
use chimeclaw_core::config::LlmConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::provider::Generator;
use chimeclaw_core::types::{Completion, GenerateParams};
use serde_json::{Value, json};

use crate::provider_registry::{AuthStyle, CHAT_PATH, ProviderConfig};

/// A generator that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleGenerator {
    /// Provider name (e.g., "openai", "deepseek").
    name: String,
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    chat_path: String,
    auth_style: AuthStyle,
    client: reqwest::Client,
}

impl OpenAiCompatibleGenerator {
    /// Create from a known provider config.
    ///
    /// Resolution order:
    /// - API key: `config.api_key` > env vars > empty
    /// - Base URL: `config.endpoint` > env override > registry default
    pub fn from_registry(registry: &ProviderConfig, config: &LlmConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // For OLLAMA_HOST / LLAMACPP_HOST, append /v1 if not present
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            auth_style: registry.auth_style,
            client: reqwest::Client::new(),
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, config: &LlmConfig) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(ChimeClawError::Config("custom provider needs a URL".into()));
        }

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: CHAT_PATH.to_string(),
            auth_style,
            client: reqwest::Client::new(),
        })
    }

    /// Full chat-completions URL.
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }
}

/// Request body for a single-prompt completion.
pub fn request_body(prompt: &str, params: &GenerateParams) -> Value {
    json!({
        "model": params.model,
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
        "messages": [{ "role": "user", "content": prompt }],
    })
}

/// Parse a chat-completions response. Reasoning models put their chain of
/// thought in `reasoning_content`; it is kept apart from the answer.
pub fn parse_completion(json: &Value) -> Result<Completion> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| ChimeClawError::Provider("No choices in response".into()))?;
    let message = &choice["message"];

    Ok(Completion {
        text: message["content"].as_str().unwrap_or_default().to_string(),
        reasoning: message["reasoning_content"]
            .as_str()
            .filter(|r| !r.is_empty())
            .map(String::from),
    })
}

#[async_trait]
impl Generator for OpenAiCompatibleGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str, params: &GenerateParams) -> Result<Completion> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(ChimeClawError::ApiKeyMissing(self.name.clone()));
        }

        let url = self.chat_url();
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body(prompt, params));
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            ChimeClawError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChimeClawError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ChimeClawError::Http(e.to_string()))?;

        let completion = parse_completion(&json)?;
        if let Some(reasoning) = &completion.reasoning {
            tracing::debug!("🧠 {} reasoning ({} chars)", self.name, reasoning.len());
        }
        Ok(completion)
    }
}
