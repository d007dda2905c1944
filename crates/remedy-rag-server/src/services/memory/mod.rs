//! Per-user conversation memory backed by a [`MessageStore`](crate::database::MessageStore).
//!
//! - Short-term: most recent turns of one conversation
//! - Long-term: similarity search across every conversation of a user
//! - History: chronological transcript for display

mod clock;
pub mod manager;
pub mod types;

pub use clock::TimestampClock;
pub use manager::MemoryManager;
pub use types::{HistoryEntry, RecordOutcome, Retrieval};
