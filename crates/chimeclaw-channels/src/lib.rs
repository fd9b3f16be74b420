//! # ChimeClaw Channels
//! Delivery channels for scheduled messages.

pub mod onebot;
pub mod telegram;
pub mod webhook;

use chimeclaw_core::config::ChannelConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Delivery;

/// Build the delivery channel selected by `config.kind`.
pub fn create_channel(config: &ChannelConfig) -> Result<Box<dyn Delivery>> {
    match config.kind.as_str() {
        "onebot" | "qq" => {
            let cfg = config.onebot.clone().unwrap_or_default();
            Ok(Box::new(onebot::OneBotChannel::new(cfg)))
        }
        "telegram" => {
            let cfg = config.telegram.clone().ok_or_else(|| {
                ChimeClawError::Config("channel.kind = telegram but [channel.telegram] missing".into())
            })?;
            Ok(Box::new(telegram::TelegramChannel::new(cfg)))
        }
        "webhook" => {
            let cfg = config.webhook.clone().ok_or_else(|| {
                ChimeClawError::Config("channel.kind = webhook but [channel.webhook] missing".into())
            })?;
            Ok(Box::new(webhook::WebhookChannel::new(cfg)))
        }
        other => Err(ChimeClawError::Config(format!("Unknown channel kind: {other}"))),
    }
}
