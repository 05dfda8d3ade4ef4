mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ai::AiBackend;
use crate::db::Database;

/// Shared state for the HTTP handlers.
///
/// `ai` is `None` when the client could not be constructed at startup
/// (missing credential); the AI routes then answer with a structured
/// "service misconfigured" error instead of crashing the request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ai: Option<Arc<dyn AiBackend>>,
}

impl AppState {
    pub fn new(db: Database, ai: Option<Arc<dyn AiBackend>>) -> Self {
        Self { db, ai }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Notes
        .route("/notes", get(handlers::list_notes))
        .route("/notes", post(handlers::create_note))
        .route("/notes/search", get(handlers::search_notes))
        .route("/notes/{id}", get(handlers::get_note))
        .route("/notes/{id}", put(handlers::update_note))
        .route("/notes/{id}", delete(handlers::delete_note))
        // AI operations
        .route("/notes/extract-info", post(handlers::extract_info))
        .route("/notes/translate", post(handlers::translate))
        .route("/notes/generate-quiz", post(handlers::generate_quiz))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
