//! # ChimeClaw Providers
//!
//! Text generators for content synthesis. Every supported backend speaks the
//! OpenAI chat-completions protocol, so a single `OpenAiCompatibleGenerator`
//! covers them; they differ only in base URL, auth style and API key.

pub mod openai_compatible;
pub mod provider_registry;

use chimeclaw_core::config::LlmConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Generator;

/// Create a generator from configuration.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn Generator>> {
    let provider_name = config.provider.as_str();
    match provider_name {
        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => Ok(Box::new(
            openai_compatible::OpenAiCompatibleGenerator::custom(other, config)?,
        )),
        _ => {
            let registry = provider_registry::get_provider_config(provider_name)
                .ok_or_else(|| ChimeClawError::ProviderNotFound(provider_name.into()))?;
            Ok(Box::new(
                openai_compatible::OpenAiCompatibleGenerator::from_registry(registry, config)?,
            ))
        }
    }
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("custom");
    names
}
