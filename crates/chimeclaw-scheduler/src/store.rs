//! In-memory schedule store, loaded once from config, immutable afterwards.

use chimeclaw_core::config::TimedMessagesConfig;

use crate::rule::ScheduleRule;

/// The active rule list. Shared read-only (`Arc<ScheduleStore>`) between the
/// dispatch loop and its workers.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    rules: Vec<ScheduleRule>,
}

impl ScheduleStore {
    /// Build the store from config. Disabled feature -> empty store.
    /// Malformed entries are excluded with a warning; the rest still load.
    /// Duplicates are kept: every entry fires on its own.
    pub fn load(config: &TimedMessagesConfig) -> Self {
        if !config.enable {
            tracing::info!("⏸️ Timed messages disabled");
            return Self::default();
        }

        let mut rules = Vec::with_capacity(config.schedules.len());
        for (i, entry) in config.schedules.iter().enumerate() {
            match ScheduleRule::from_entry(entry) {
                Ok(rule) => rules.push(rule),
                Err(e) => tracing::warn!("⚠️ Skipping schedule #{i}: {e}"),
            }
        }

        tracing::info!("📅 Loaded {} timed message schedule(s)", rules.len());
        Self { rules }
    }

    /// Build directly from rules.
    pub fn from_rules(rules: Vec<ScheduleRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimeclaw_core::config::ScheduleEntry;

    fn entry(user: &str, hour: u32) -> ScheduleEntry {
        ScheduleEntry {
            user_id: Some(user.into()),
            message: Some("hello".into()),
            hour: Some(hour),
            minute: Some(0),
            weekdays: Some(vec![1, 2, 3, 4, 5, 6, 7]),
            dynamic: None,
            context_size: None,
        }
    }

    #[test]
    fn test_disabled_loads_nothing() {
        let config = TimedMessagesConfig {
            enable: false,
            schedules: vec![entry("u1", 8)],
            ..TimedMessagesConfig::default()
        };
        assert!(ScheduleStore::load(&config).is_empty());
    }

    #[test]
    fn test_malformed_entries_are_excluded() {
        let config = TimedMessagesConfig {
            enable: true,
            schedules: vec![
                entry("u1", 8),
                entry("u2", 25),
                ScheduleEntry::default(),
                entry("u3", 9),
            ],
            ..TimedMessagesConfig::default()
        };
        let store = ScheduleStore::load(&config);
        let recipients: Vec<_> = store.rules().iter().map(|r| r.recipient_id.as_str()).collect();
        assert_eq!(recipients, vec!["u1", "u3"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let config = TimedMessagesConfig {
            enable: true,
            schedules: vec![entry("u1", 8), entry("u1", 8)],
            ..TimedMessagesConfig::default()
        };
        assert_eq!(ScheduleStore::load(&config).len(), 2);
    }
}
