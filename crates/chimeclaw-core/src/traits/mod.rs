//! Collaborator traits. Implementations live in the memory, providers and
//! channels crates; the scheduler only sees these seams.

pub mod channel;
pub mod memory;
pub mod provider;

pub use channel::Delivery;
pub use memory::{ChatStreamRegistry, MessageStore, RECALL_RETENTION_SECS};
pub use provider::Generator;
