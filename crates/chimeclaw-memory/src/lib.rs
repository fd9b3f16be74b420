//! # ChimeClaw Memory
//!
//! SQLite-backed message persistence: message records, private chat streams
//! and recalled messages. One connection behind a mutex; every call is short.

pub mod sqlite;
pub mod stream;

pub use sqlite::SqliteMessageStore;
pub use stream::private_stream_id;
