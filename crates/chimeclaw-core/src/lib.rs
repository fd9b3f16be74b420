//! # ChimeClaw Core
//!
//! Shared building blocks for the ChimeClaw workspace: configuration,
//! the error type, message/history types, and the traits every external
//! collaborator (store, generator, delivery channel) implements.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ChimeClawConfig;
pub use error::{ChimeClawError, Result};
pub use traits::{ChatStreamRegistry, Delivery, Generator, MessageStore};
