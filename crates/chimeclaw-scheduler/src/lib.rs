//! # ChimeClaw Scheduler
//!
//! Timed messages: time-of-day rules that send either a fixed template or a
//! message synthesized from the recipient's recent conversation.
//!
//! ## Architecture
//! ```text
//! DispatchLoop (timer queue | minute poll)
//!   └── due rule → DispatchJob ──mpsc──► DispatchWorker (semaphore-bounded)
//!                                          └── Dispatcher
//!                                                ├── static  → template
//!                                                ├── dynamic → HistoryReader
//!                                                │             → ContextComposer
//!                                                │             → ContentSynthesizer
//!                                                └── Delivery::send_to_recipient
//! ```
//!
//! Failures never leave the `Dispatcher`: a dynamic rule degrades to its
//! template, a failed delivery drops that one occurrence.

pub mod compose;
pub mod dispatch;
pub mod engine;
pub mod history;
pub mod rule;
pub mod store;
pub mod synth;
pub mod worker;

#[cfg(test)]
mod testing;

pub use compose::{ContextComposer, Persona};
pub use dispatch::{DispatchEvent, DispatchStats, Dispatcher, StatsSnapshot};
pub use engine::{DispatchLoop, DispatchMode, FireQueue, LoopOptions, spawn_dispatch_loop};
pub use history::HistoryReader;
pub use rule::ScheduleRule;
pub use store::ScheduleStore;
pub use synth::{Content, ContentSynthesizer};
pub use worker::{DispatchJob, DispatchWorker};
