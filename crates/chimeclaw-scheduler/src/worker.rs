//! Dispatch worker: the consumer half of the loop.
//!
//! The loop only enqueues jobs; the worker runs each one as its own task
//! with nothing shared between them. A hung generator or channel stalls
//! only the job that called it, never the next job or the next evaluation.

use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::dispatch::Dispatcher;
use crate::store::ScheduleStore;

/// A rule occurrence queued for handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchJob {
    /// Index into the shared `ScheduleStore`.
    pub rule_index: usize,
    /// Local wall-clock time the occurrence was due.
    pub due_at: NaiveDateTime,
}

pub type JobSender = mpsc::UnboundedSender<DispatchJob>;
pub type JobReceiver = mpsc::UnboundedReceiver<DispatchJob>;

pub fn job_channel() -> (JobSender, JobReceiver) {
    mpsc::unbounded_channel()
}

pub struct DispatchWorker {
    dispatcher: Arc<Dispatcher>,
    store: Arc<ScheduleStore>,
}

impl DispatchWorker {
    pub fn new(dispatcher: Arc<Dispatcher>, store: Arc<ScheduleStore>) -> Self {
        Self { dispatcher, store }
    }

    /// Consume jobs until every sender is dropped, then wait for in-flight
    /// jobs to finish.
    pub async fn run(self, mut jobs: JobReceiver) {
        let mut in_flight = JoinSet::new();

        while let Some(job) = jobs.recv().await {
            let Some(rule) = self.store.get(job.rule_index).cloned() else {
                tracing::warn!("⚠️ Dropping job for unknown rule #{}", job.rule_index);
                continue;
            };
            let dispatcher = self.dispatcher.clone();
            in_flight.spawn(async move {
                tracing::info!("🔔 Timed message triggered: {}", rule.label());
                // Failures are logged and counted inside dispatch.
                let _ = dispatcher.dispatch(&rule, job.due_at).await;
            });

            while let Some(done) = in_flight.try_join_next() {
                log_join(done);
            }
        }

        while let Some(done) = in_flight.join_next().await {
            log_join(done);
        }
    }
}

fn log_join(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        tracing::error!("❌ Dispatch task aborted: {e}");
    }
}
