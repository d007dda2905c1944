use serde::Serialize;

use crate::models::chat::ChatMessage;

/// Output of the Context Composer for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    /// Memory and knowledge text, trimmed
    pub context: String,
    /// Full user-facing prompt with the context and query blocks
    pub prompt: String,
    /// One label per knowledge hit, in rank order
    pub references: Vec<String>,
}

impl ComposedPrompt {
    /// Messages for the chat completion call.
    pub fn messages(&self, system_instruction: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(system_instruction),
            ChatMessage::user(self.prompt.clone()),
        ]
    }
}

/// Row of the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub preview: String,
}

/// Result of a completed chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub conversation_id: String,
    pub response: String,
    pub references: Vec<String>,
}
