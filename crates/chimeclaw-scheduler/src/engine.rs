//! Dispatch loop — the time-driven producer.
//!
//! Two strategies share the same submit path:
//! - `Timer`: a min-heap of next fire times; sleep until the earliest one.
//! - `Poll`: evaluate the exact-minute predicate once per wall-clock minute.
//!
//! The loop never awaits a dispatch. Due rules become `DispatchJob`s on an
//! unbounded channel consumed by the `DispatchWorker`.

use chimeclaw_core::config::TimedMessagesConfig;
use chrono::{Duration, Local, NaiveDateTime, Timelike};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::dispatch::{DispatchStats, Dispatcher};
use crate::store::ScheduleStore;
use crate::worker::{DispatchJob, DispatchWorker, JobSender, job_channel};

/// Longest single sleep. Wall-clock jumps (suspend, DST, manual changes)
/// are noticed within this window.
const MAX_SLEEP: std::time::Duration = std::time::Duration::from_secs(30);

/// Source of the current local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    #[default]
    Timer,
    Poll,
}

impl DispatchMode {
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "timer" | "" => Self::Timer,
            "poll" => Self::Poll,
            other => {
                tracing::warn!("⚠️ Unknown timed message mode '{other}', using timer");
                Self::Timer
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub mode: DispatchMode,
    /// Timer mode only: how late a popped occurrence may be and still fire.
    pub late_grace: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self::from(&TimedMessagesConfig::default())
    }
}

impl From<&TimedMessagesConfig> for LoopOptions {
    fn from(config: &TimedMessagesConfig) -> Self {
        Self {
            mode: DispatchMode::parse(&config.mode),
            late_grace: i64::try_from(config.late_grace_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }
}

/// A popped occurrence. `late` ones are skipped, never caught up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub rule_index: usize,
    pub due_at: NaiveDateTime,
    pub late: bool,
}

/// Next fire time per rule, earliest first. Ties pop in rule-list order.
#[derive(Debug, Default)]
pub struct FireQueue {
    heap: BinaryHeap<Reverse<(NaiveDateTime, usize)>>,
}

impl FireQueue {
    pub fn build(store: &ScheduleStore, now: NaiveDateTime) -> Self {
        let heap = store
            .rules()
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| rule.next_fire_after(now).map(|at| Reverse((at, i))))
            .collect();
        Self { heap }
    }

    pub fn peek_next(&self) -> Option<NaiveDateTime> {
        self.heap.peek().map(|Reverse((at, _))| *at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pop every occurrence due at or before `now` and reschedule each rule
    /// strictly after `now`, so one occurrence is handled at most once.
    pub fn pop_due(&mut self, store: &ScheduleStore, now: NaiveDateTime, grace: Duration) -> Vec<Occurrence> {
        let mut due = Vec::new();
        while let Some(Reverse((at, index))) = self.heap.peek().copied() {
            if at > now {
                break;
            }
            self.heap.pop();
            due.push(Occurrence {
                rule_index: index,
                due_at: at,
                late: now - at > grace,
            });
        }

        for occurrence in &due {
            if let Some(next) = store
                .get(occurrence.rule_index)
                .and_then(|rule| rule.next_fire_after(now))
            {
                self.heap.push(Reverse((next, occurrence.rule_index)));
            }
        }
        due
    }
}

pub struct DispatchLoop {
    store: Arc<ScheduleStore>,
    jobs: JobSender,
    options: LoopOptions,
    stats: Arc<DispatchStats>,
    clock: Clock,
}

impl DispatchLoop {
    pub fn new(store: Arc<ScheduleStore>, jobs: JobSender, options: LoopOptions, stats: Arc<DispatchStats>) -> Self {
        Self {
            store,
            jobs,
            options,
            stats,
            clock: Arc::new(local_now),
        }
    }

    /// Replace the system local clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Indices of the rules matching `now`, in rule-list order.
    pub fn due_at(&self, now: &NaiveDateTime) -> Vec<usize> {
        self.store
            .rules()
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matches(now))
            .map(|(i, _)| i)
            .collect()
    }

    /// One poll evaluation: submit every rule matching `now`. Returns how
    /// many jobs were queued.
    pub fn evaluate(&self, now: NaiveDateTime) -> usize {
        self.due_at(&now)
            .into_iter()
            .take_while(|&rule_index| self.submit(rule_index, now))
            .count()
    }

    fn submit(&self, rule_index: usize, due_at: NaiveDateTime) -> bool {
        match self.jobs.send(DispatchJob { rule_index, due_at }) {
            Ok(()) => true,
            Err(_) => {
                tracing::error!("❌ Dispatch worker gone, dropping rule #{rule_index}");
                false
            }
        }
    }

    pub async fn run(self) {
        if self.store.is_empty() {
            tracing::info!("⏸️ No timed messages scheduled, dispatch loop idle");
            return;
        }

        tracing::info!(
            "⏰ Dispatch loop started ({:?} mode, {} rule(s))",
            self.options.mode,
            self.store.len()
        );
        match self.options.mode {
            DispatchMode::Timer => self.run_timer().await,
            DispatchMode::Poll => self.run_poll().await,
        }
    }

    async fn run_timer(&self) {
        let mut queue = FireQueue::build(&self.store, self.now());

        while let Some(next) = queue.peek_next() {
            let now = self.now();
            if next > now {
                let wait = (next - now).to_std().unwrap_or_default().min(MAX_SLEEP);
                tokio::time::sleep(wait).await;
                continue;
            }

            for occurrence in queue.pop_due(&self.store, now, self.options.late_grace) {
                if occurrence.late {
                    self.stats.record_skipped_late();
                    tracing::warn!(
                        "⚠️ Skipping late occurrence of rule #{} (due {}, now {})",
                        occurrence.rule_index,
                        occurrence.due_at,
                        now
                    );
                } else if !self.submit(occurrence.rule_index, occurrence.due_at) {
                    return;
                }
            }
        }
        tracing::info!("⏹️ No further fire times, dispatch loop stopped");
    }

    async fn run_poll(&self) {
        let mut last_minute = None;
        loop {
            let now = self.now();
            let minute = truncate_to_minute(now);
            if last_minute != Some(minute) {
                last_minute = Some(minute);
                let matched = self.due_at(&now).len();
                if self.evaluate(minute) < matched {
                    return;
                }
            }
            tokio::time::sleep(until_next_minute(now)).await;
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(at)
}

fn until_next_minute(now: NaiveDateTime) -> std::time::Duration {
    let next = truncate_to_minute(now) + Duration::minutes(1);
    (next - now).to_std().unwrap_or(MAX_SLEEP)
}

/// Start the worker and the loop on the runtime. `None` when there is
/// nothing to schedule.
pub fn spawn_dispatch_loop(
    store: Arc<ScheduleStore>,
    dispatcher: Arc<Dispatcher>,
    config: &TimedMessagesConfig,
) -> Option<JoinHandle<()>> {
    if store.is_empty() {
        tracing::info!("⏸️ No timed messages scheduled");
        return None;
    }

    let (jobs, rx) = job_channel();
    let stats = dispatcher.stats();
    let worker = DispatchWorker::new(dispatcher, store.clone());
    tokio::spawn(worker.run(rx));

    let dispatch_loop = DispatchLoop::new(store, jobs, LoopOptions::from(config), stats);
    Some(tokio::spawn(dispatch_loop.run()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ScheduleRule;
    use crate::testing::{FakeGenerator, FakeStore, FakeStreams, RecordingChannel};
    use chimeclaw_core::config::BotConfig;
    use chimeclaw_core::types::GenerateParams;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    fn store(rules: Vec<ScheduleRule>) -> Arc<ScheduleStore> {
        Arc::new(ScheduleStore::from_rules(rules))
    }

    fn weekday_morning(user: &str) -> ScheduleRule {
        ScheduleRule::new(user, "Good morning!", 8, 0, [1, 2, 3, 4, 5]).unwrap()
    }

    fn dispatch_loop(store: Arc<ScheduleStore>) -> (DispatchLoop, crate::worker::JobReceiver) {
        let (tx, rx) = job_channel();
        let stats = Arc::new(DispatchStats::default());
        (DispatchLoop::new(store, tx, LoopOptions::default(), stats), rx)
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(DispatchMode::parse("timer"), DispatchMode::Timer);
        assert_eq!(DispatchMode::parse(" Poll "), DispatchMode::Poll);
        assert_eq!(DispatchMode::parse("cron"), DispatchMode::Timer);
    }

    #[test]
    fn test_evaluate_wednesday_exact_minute() {
        let (dl, mut rx) = dispatch_loop(store(vec![weekday_morning("u1")]));

        // 2026-02-25 is a Wednesday.
        assert_eq!(dl.evaluate(at(25, 8, 0, 0)), 1);
        assert_eq!(rx.try_recv().unwrap().rule_index, 0);

        assert_eq!(dl.evaluate(at(25, 8, 1, 0)), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_evaluate_weekday_mismatch() {
        let (dl, _rx) = dispatch_loop(store(vec![weekday_morning("u1")]));
        // Saturday.
        assert_eq!(dl.evaluate(at(28, 8, 0, 0)), 0);
    }

    #[test]
    fn test_duplicate_rules_fire_independently_in_order() {
        let (dl, mut rx) = dispatch_loop(store(vec![
            weekday_morning("u1"),
            ScheduleRule::new("u2", "later", 9, 0, [3]).unwrap(),
            weekday_morning("u1"),
        ]));
        assert_eq!(dl.evaluate(at(25, 8, 0, 0)), 2);
        assert_eq!(rx.try_recv().unwrap().rule_index, 0);
        assert_eq!(rx.try_recv().unwrap().rule_index, 2);
    }

    #[test]
    fn test_evaluate_with_empty_store_is_noop() {
        let (dl, _rx) = dispatch_loop(store(Vec::new()));
        assert!(dl.due_at(&at(25, 8, 0, 0)).is_empty());
        assert_eq!(dl.evaluate(at(25, 8, 0, 0)), 0);
    }

    #[test]
    fn test_fire_queue_orders_and_reschedules() {
        let store = store(vec![
            ScheduleRule::new("late", "x", 9, 0, [3]).unwrap(),
            weekday_morning("early"),
        ]);
        let mut queue = FireQueue::build(&store, at(25, 7, 0, 0));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_next(), Some(at(25, 8, 0, 0)));

        let grace = Duration::seconds(60);
        assert!(queue.pop_due(&store, at(25, 7, 59, 59), grace).is_empty());

        let due = queue.pop_due(&store, at(25, 8, 0, 1), grace);
        assert_eq!(due, vec![Occurrence { rule_index: 1, due_at: at(25, 8, 0, 0), late: false }]);
        // Rule 1 moves to Thursday; rule 0 is now first.
        assert_eq!(queue.peek_next(), Some(at(25, 9, 0, 0)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fire_queue_skips_late_occurrences_once() {
        let store = store(vec![weekday_morning("u1")]);
        let mut queue = FireQueue::build(&store, at(25, 7, 0, 0));

        // Woke up ten minutes late (e.g. after suspend).
        let due = queue.pop_due(&store, at(25, 8, 10, 0), Duration::seconds(60));
        assert_eq!(due.len(), 1);
        assert!(due[0].late);

        // Not replayed; the next one is tomorrow.
        assert!(queue.pop_due(&store, at(25, 8, 11, 0), Duration::seconds(60)).is_empty());
        assert_eq!(queue.peek_next(), Some(at(26, 8, 0, 0)));
    }

    #[test]
    fn test_until_next_minute() {
        assert_eq!(until_next_minute(at(25, 8, 0, 45)), std::time::Duration::from_secs(15));
        assert_eq!(until_next_minute(at(25, 8, 0, 0)), std::time::Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_one_failing_rule_does_not_block_others() {
        let store = store(vec![
            weekday_morning("u1"),
            weekday_morning("bad"),
            weekday_morning("u3"),
        ]);
        let channel = Arc::new(RecordingChannel::failing_for(&["bad"]));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(FakeStore::default()),
            Arc::new(FakeStreams::default()),
            Arc::new(FakeGenerator::replying("unused")),
            channel.clone(),
            &BotConfig::default(),
            GenerateParams::default(),
        ));
        let stats = dispatcher.stats();

        let (jobs, rx) = job_channel();
        let dl = DispatchLoop::new(store.clone(), jobs, LoopOptions::default(), stats.clone());
        assert_eq!(dl.evaluate(at(25, 8, 0, 0)), 3);
        drop(dl);

        DispatchWorker::new(dispatcher, store).run(rx).await;

        let mut recipients: Vec<String> = channel.sent().into_iter().map(|(r, _)| r).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["u1", "u3"]);
        let snap = stats.snapshot();
        assert_eq!(snap.fired, 3);
        assert_eq!(snap.delivered, 2);
        assert_eq!(snap.failed, 1);
    }

    /// Local time that follows the paused tokio clock, jumping forward by
    /// `jump` once `jump_after` has elapsed (a suspended host waking up).
    fn following_clock(start: NaiveDateTime, jump_after: std::time::Duration, jump: Duration) -> Clock {
        let origin = tokio::time::Instant::now();
        Arc::new(move || {
            let elapsed = origin.elapsed();
            let now = start + Duration::from_std(elapsed).unwrap();
            if elapsed >= jump_after { now + jump } else { now }
        })
    }

    fn steady_clock(start: NaiveDateTime) -> Clock {
        following_clock(start, std::time::Duration::MAX, Duration::zero())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_loop_fires_on_time() {
        let (jobs, mut rx) = job_channel();
        let stats = Arc::new(DispatchStats::default());
        let dl = DispatchLoop::new(store(vec![weekday_morning("u1")]), jobs, LoopOptions::default(), stats.clone())
            .with_clock(steady_clock(at(25, 7, 59, 0)));
        let handle = tokio::spawn(dl.run());

        let job = rx.recv().await.unwrap();
        handle.abort();
        assert_eq!(job, DispatchJob { rule_index: 0, due_at: at(25, 8, 0, 0) });
        assert_eq!(stats.snapshot().skipped_late, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_loop_skips_late_occurrence_and_keeps_going() {
        let (jobs, mut rx) = job_channel();
        let stats = Arc::new(DispatchStats::default());
        let rules = vec![
            weekday_morning("u1"),
            ScheduleRule::new("u2", "later", 8, 15, [3]).unwrap(),
        ];
        // Host sleeps through 08:00 and wakes at 08:10.
        let clock = following_clock(
            at(25, 7, 59, 50),
            std::time::Duration::from_secs(10),
            Duration::minutes(10),
        );
        let dl = DispatchLoop::new(store(rules), jobs, LoopOptions::default(), stats.clone()).with_clock(clock);
        let handle = tokio::spawn(dl.run());

        let job = rx.recv().await.unwrap();
        handle.abort();
        assert_eq!(job, DispatchJob { rule_index: 1, due_at: at(25, 8, 15, 0) });
        assert!(rx.try_recv().is_err());
        assert_eq!(stats.snapshot().skipped_late, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_loop_stops_when_worker_is_gone() {
        let (jobs, rx) = job_channel();
        drop(rx);
        let dl = DispatchLoop::new(
            store(vec![weekday_morning("u1")]),
            jobs,
            LoopOptions::default(),
            Arc::new(DispatchStats::default()),
        )
        .with_clock(steady_clock(at(25, 7, 59, 59)));

        let finished = tokio::time::timeout(std::time::Duration::from_secs(120), dl.run()).await;
        assert!(finished.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_evaluates_each_minute_once() {
        let (jobs, mut rx) = job_channel();
        let options = LoopOptions { mode: DispatchMode::Poll, ..LoopOptions::default() };
        let dl = DispatchLoop::new(
            store(vec![weekday_morning("u1")]),
            jobs,
            options,
            Arc::new(DispatchStats::default()),
        )
        .with_clock(steady_clock(at(25, 7, 59, 30)));
        let handle = tokio::spawn(dl.run());

        let job = rx.recv().await.unwrap();
        assert_eq!(job, DispatchJob { rule_index: 0, due_at: at(25, 8, 0, 0) });

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
        handle.abort();
    }

    #[tokio::test]
    async fn test_spawn_with_nothing_scheduled() {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(FakeStore::default()),
            Arc::new(FakeStreams::default()),
            Arc::new(FakeGenerator::failing()),
            Arc::new(RecordingChannel::default()),
            &BotConfig::default(),
            GenerateParams::default(),
        ));
        let handle = spawn_dispatch_loop(store(Vec::new()), dispatcher, &TimedMessagesConfig::default());
        assert!(handle.is_none());
    }
}
