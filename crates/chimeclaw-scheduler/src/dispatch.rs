//! Rule dispatch — resolves a fired rule's text and hands it to the channel.
//!
//! Every collaborator failure is contained here: a broken store, registry or
//! generator degrades the rule to its template; a broken channel drops this
//! occurrence. Nothing propagates into the loop.

use chimeclaw_core::config::BotConfig;
use chimeclaw_core::error::Result;
use chimeclaw_core::traits::{ChatStreamRegistry, Delivery, Generator, MessageStore};
use chimeclaw_core::types::GenerateParams;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compose::{ContextComposer, Persona};
use crate::history::HistoryReader;
use crate::rule::ScheduleRule;
use crate::synth::{Content, ContentSynthesizer};

/// One fired occurrence, consumed by the delivery channel and then dropped.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub rule: ScheduleRule,
    pub content: Content,
    /// Local wall-clock time the occurrence was due.
    pub fired_at: NaiveDateTime,
}

/// Counters shared by the loop and its workers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    fired: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    fallbacks: AtomicU64,
    skipped_late: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub fired: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Dynamic rules that ended up sending their template.
    pub fallbacks: u64,
    pub skipped_late: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fired: self.fired.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            skipped_late: self.skipped_late.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_skipped_late(&self) {
        self.skipped_late.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct Dispatcher {
    history: HistoryReader,
    streams: Arc<dyn ChatStreamRegistry>,
    composer: ContextComposer,
    synthesizer: ContentSynthesizer,
    channel: Arc<dyn Delivery>,
    platform: String,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn MessageStore>,
        streams: Arc<dyn ChatStreamRegistry>,
        generator: Arc<dyn Generator>,
        channel: Arc<dyn Delivery>,
        bot: &BotConfig,
        params: GenerateParams,
    ) -> Self {
        Self {
            history: HistoryReader::new(store),
            streams,
            composer: ContextComposer::new(Persona::from(bot)),
            synthesizer: ContentSynthesizer::new(generator, params),
            channel,
            platform: bot.platform.clone(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Final text for a rule: template for static rules; for dynamic rules,
    /// synthesized from history, or the template when anything on the way
    /// fails or there is no history.
    pub async fn resolve(&self, rule: &ScheduleRule) -> Content {
        if !rule.dynamic {
            return Content::Static(rule.template.clone());
        }

        let stream_id = match self.streams.resolve(&self.platform, &rule.recipient_id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("⚠️ No chat stream for {}, using template: {e}", rule.recipient_id);
                return Content::settle(&rule.template, None);
            }
        };

        let history = match self.history.fetch(&stream_id, rule.context_size).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("⚠️ History read failed for {}, using template: {e}", rule.recipient_id);
                return Content::settle(&rule.template, None);
            }
        };

        if history.is_empty() {
            tracing::warn!("⚠️ No history for {}, using template", rule.recipient_id);
            return Content::settle(&rule.template, None);
        }

        let prompt = self.composer.compose(&history, &rule.template);
        self.synthesizer.synthesize(&prompt, &rule.template).await
    }

    /// Resolve and deliver one occurrence.
    pub async fn dispatch(&self, rule: &ScheduleRule, fired_at: NaiveDateTime) -> Result<DispatchEvent> {
        self.stats.fired.fetch_add(1, Ordering::Relaxed);

        let content = self.resolve(rule).await;
        if rule.dynamic && !content.is_synthesized() {
            self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
        }

        if let Err(e) = self
            .channel
            .send_to_recipient(&rule.recipient_id, content.text())
            .await
        {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!("❌ Timed message to {} failed via {}: {e}", rule.recipient_id, self.channel.name());
            return Err(e);
        }

        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        tracing::info!("✅ Timed message sent to {}", rule.recipient_id);
        Ok(DispatchEvent {
            rule: rule.clone(),
            content,
            fired_at,
        })
    }
}
