pub mod config;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use state::AppState;

/// Health probes at the root, chat API under `/api/rag`.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let rag_routes = Router::new()
        .route(
            "/start-conversation",
            post(handlers::conversation::start_conversation),
        )
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations)
                .delete(handlers::conversation::delete_all_conversations),
        )
        .route(
            "/conversation/{conversation_id}",
            get(handlers::conversation::get_conversation)
                .delete(handlers::conversation::delete_conversation),
        )
        .route("/ai-remedy", post(handlers::remedy::ai_remedy));

    Router::new()
        .merge(public_routes)
        .nest("/api/rag", rag_routes)
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(state)
}
