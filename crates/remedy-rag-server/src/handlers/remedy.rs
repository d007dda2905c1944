use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use crate::models::chat::{RemedyRequest, RemedyResponse};
use crate::services::conversation::RemedyChatService;
use crate::utils::error::ApiError;

use super::{non_empty, parse_lenient};

pub async fn ai_remedy(
    State(chat): State<Arc<RemedyChatService>>,
    body: Bytes,
) -> Result<Json<RemedyResponse>, ApiError> {
    let request: RemedyRequest = parse_lenient(&body);

    let (Some(query), Some(email)) = (non_empty(request.query), non_empty(request.email)) else {
        return Err(ApiError::BadRequest("Missing query or email".to_string()));
    };

    let reply = chat
        .handle_turn(&email, non_empty(request.conversation_id), &query)
        .await?;

    Ok(Json(RemedyResponse {
        conversation_id: reply.conversation_id,
        query,
        response: reply.response,
        references: reply.references,
    }))
}
