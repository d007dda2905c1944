use serde::{Deserialize, Serialize};

use crate::database::Role;
use crate::services::conversation::ConversationSummary;
use crate::services::memory::HistoryEntry;

// ===== REQUEST MODELS =====

/// Bodies are parsed leniently: missing or malformed fields become `None`
/// and are rejected by the handler with a 400.
#[derive(Debug, Default, Deserialize)]
pub struct StartConversationRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemedyRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct StartConversationResponse {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct ConversationMessagesResponse {
    pub messages: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RemedyResponse {
    pub conversation_id: String,
    pub query: String,
    pub response: String,
    pub references: Vec<String>,
}

// ===== LLM MESSAGES =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}
