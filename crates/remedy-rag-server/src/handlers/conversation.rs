use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::chat::*;
use crate::services::conversation::ConversationLifecycle;
use crate::utils::error::ApiError;

use super::{non_empty, parse_lenient};

const MISSING_EMAIL: &str = "Missing email";

fn require_email(email: Option<String>) -> Result<String, ApiError> {
    non_empty(email).ok_or_else(|| ApiError::BadRequest(MISSING_EMAIL.to_string()))
}

pub async fn start_conversation(
    State(lifecycle): State<Arc<ConversationLifecycle>>,
    body: Bytes,
) -> Result<Json<StartConversationResponse>, ApiError> {
    let request: StartConversationRequest = parse_lenient(&body);
    let email = require_email(request.email)?;

    let conversation_id = lifecycle.start(&email).await;
    Ok(Json(StartConversationResponse { conversation_id }))
}

pub async fn list_conversations(
    State(lifecycle): State<Arc<ConversationLifecycle>>,
    Query(params): Query<EmailQuery>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let email = require_email(params.email)?;

    let conversations = lifecycle.list(&email).await.into_value();
    Ok(Json(ConversationListResponse { conversations }))
}

pub async fn get_conversation(
    State(lifecycle): State<Arc<ConversationLifecycle>>,
    Path(conversation_id): Path<String>,
    Query(params): Query<EmailQuery>,
) -> Result<Json<ConversationMessagesResponse>, ApiError> {
    let email = require_email(params.email)?;

    let messages = lifecycle.fetch(&email, &conversation_id).await.into_value();
    Ok(Json(ConversationMessagesResponse { messages }))
}

pub async fn delete_conversation(
    State(lifecycle): State<Arc<ConversationLifecycle>>,
    Path(conversation_id): Path<String>,
    Query(params): Query<EmailQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let email = require_email(params.email)?;

    lifecycle
        .delete(&email, &conversation_id)
        .await
        .map_err(|e| ApiError::StoreError(format!("{:#}", e)))?;

    info!("Conversation {} deleted by {}", conversation_id, email);
    Ok(Json(DeleteResponse {
        success: true,
        message: "Conversation deleted.".to_string(),
    }))
}

pub async fn delete_all_conversations(
    State(lifecycle): State<Arc<ConversationLifecycle>>,
    Query(params): Query<EmailQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let email = require_email(params.email)?;

    lifecycle
        .delete_all(&email)
        .await
        .map_err(|e| ApiError::StoreError(format!("{:#}", e)))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "All chat history deleted for user.".to_string(),
    }))
}
