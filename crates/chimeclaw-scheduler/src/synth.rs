//! Content synthesis and the template fallback policy.

use chimeclaw_core::error::Result;
use chimeclaw_core::traits::Generator;
use chimeclaw_core::types::GenerateParams;
use serde::Serialize;
use std::sync::Arc;

/// The text a rule finally sends, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Content {
    /// The rule's template, verbatim.
    Static(String),
    /// Generator output.
    Synthesized(String),
}

impl Content {
    /// Fallback precedence in one place.
    ///
    /// `attempt` is `None` when synthesis was skipped (static rule, or no
    /// history to ground it). A failed or blank generation falls back to the
    /// template; only a non-blank generation is sent as synthesized.
    pub fn settle(template: &str, attempt: Option<Result<String>>) -> Self {
        match attempt {
            Some(Ok(text)) if !text.trim().is_empty() => Content::Synthesized(text),
            _ => Content::Static(template.to_string()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Content::Static(t) | Content::Synthesized(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Content::Static(t) | Content::Synthesized(t) => t,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, Content::Synthesized(_))
    }
}

/// Wraps the generator call with fixed sampling params and the fallback.
#[derive(Clone)]
pub struct ContentSynthesizer {
    generator: Arc<dyn Generator>,
    params: GenerateParams,
}

impl ContentSynthesizer {
    pub fn new(generator: Arc<dyn Generator>, params: GenerateParams) -> Self {
        Self { generator, params }
    }

    /// Never fails and never yields an empty message.
    pub async fn synthesize(&self, prompt: &str, template: &str) -> Content {
        let attempt = match self.generator.complete(prompt, &self.params).await {
            Ok(completion) => {
                if let Some(reasoning) = &completion.reasoning {
                    tracing::debug!("🧠 Generator reasoning: {} chars", reasoning.len());
                }
                if completion.text.trim().is_empty() {
                    tracing::warn!("⚠️ Generated message is empty, using template");
                }
                Ok(completion.text)
            }
            Err(e) => {
                tracing::warn!("⚠️ Message generation via {} failed, using template: {e}", self.generator.name());
                Err(e)
            }
        };

        let content = Content::settle(template, Some(attempt));
        if let Content::Synthesized(text) = &content {
            let preview: String = text.chars().take(30).collect();
            tracing::info!("✨ Generated dynamic message: {preview}...");
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGenerator;
    use chimeclaw_core::error::ChimeClawError;

    #[test]
    fn test_settle_precedence() {
        assert_eq!(Content::settle("tpl", None), Content::Static("tpl".into()));
        assert_eq!(
            Content::settle("tpl", Some(Err(ChimeClawError::Provider("down".into())))),
            Content::Static("tpl".into())
        );
        assert_eq!(
            Content::settle("tpl", Some(Ok("  \n\t".into()))),
            Content::Static("tpl".into())
        );
        assert_eq!(
            Content::settle("tpl", Some(Ok("Hi there".into()))),
            Content::Synthesized("Hi there".into())
        );
    }

    #[tokio::test]
    async fn test_synthesize_returns_generator_output() {
        let generator = Arc::new(FakeGenerator::replying("How did the interview go?"));
        let synth = ContentSynthesizer::new(generator.clone(), GenerateParams::default());
        let content = synth.synthesize("prompt", "template").await;
        assert_eq!(content, Content::Synthesized("How did the interview go?".into()));
        assert_eq!(generator.prompts(), vec!["prompt".to_string()]);
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_on_error_and_blank() {
        let failing = ContentSynthesizer::new(Arc::new(FakeGenerator::failing()), GenerateParams::default());
        assert_eq!(failing.synthesize("p", "template").await, Content::Static("template".into()));

        let blank = ContentSynthesizer::new(Arc::new(FakeGenerator::replying("   ")), GenerateParams::default());
        assert_eq!(blank.synthesize("p", "template").await, Content::Static("template".into()));
    }
}
