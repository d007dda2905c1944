//! Conversation flow on top of the memory layer
//!
//! - Context composition (memory + knowledge into one prompt)
//! - Conversation lifecycle (start, list, fetch, delete)
//! - The per-turn chat pipeline

mod context_builder;
pub mod lifecycle;
pub mod manager;
pub mod types;

pub use context_builder::{ContextComposer, KNOWLEDGE_SEPARATOR};
pub use lifecycle::ConversationLifecycle;
pub use manager::{ChatSettings, RemedyChatService};
pub use types::{ComposedPrompt, ConversationSummary, TurnReply};
