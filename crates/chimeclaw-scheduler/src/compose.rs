//! Context composer: turns recent history plus a rule template into a
//! synthesis prompt. Pure: same inputs, same prompt.

use chimeclaw_core::config::BotConfig;
use chimeclaw_core::types::HistoricalMessage;

/// Label for every speaker that is not the bot.
pub const USER_LABEL: &str = "User";

/// Who the bot is when it speaks in a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub self_id: String,
    pub nickname: String,
    pub personality: String,
}

impl From<&BotConfig> for Persona {
    fn from(bot: &BotConfig) -> Self {
        Self {
            self_id: bot.self_id.clone(),
            nickname: bot.nickname.clone(),
            personality: bot.personality.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextComposer {
    persona: Persona,
}

impl ContextComposer {
    pub fn new(persona: Persona) -> Self {
        Self { persona }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// One `"{speaker}: {text}"` line per message, in the given order.
    pub fn transcript(&self, history: &[HistoricalMessage]) -> String {
        history
            .iter()
            .map(|msg| {
                let speaker = if msg.sender_id == self.persona.self_id {
                    self.persona.nickname.as_str()
                } else {
                    USER_LABEL
                };
                format!("{speaker}: {}", msg.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full prompt: persona, transcript, template and output rules.
    pub fn compose(&self, history: &[HistoricalMessage], template: &str) -> String {
        format!(
            "You are an AI assistant named {name}. Using the conversation history below, \
write one new message to send to the user.

Conversation history between you and the user:
{transcript}

Write the new message from this template or instruction:
{template}

Rules:
1. Output only the message itself, with no prefix such as \"I would say:\" or \"Reply:\".
2. Keep it natural and consistent with the earlier conversation.
3. Show that you remember what the user talked about.
4. Stay in character: {personality}

Your message:",
            name = self.persona.nickname,
            transcript = self.transcript(history),
            template = template,
            personality = self.persona.personality,
        )
    }
}
