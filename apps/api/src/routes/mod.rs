pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::items::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Blank family
        .route("/api/v1/items/blank-word", post(handlers::handle_blank_word))
        .route(
            "/api/v1/items/blank-phrase",
            post(handlers::handle_blank_phrase),
        )
        .route(
            "/api/v1/items/blank-clause",
            post(handlers::handle_blank_clause),
        )
        // Sentence-level items
        .route("/api/v1/items/grammar", post(handlers::handle_grammar))
        .route("/api/v1/items/vocabulary", post(handlers::handle_vocabulary))
        .route("/api/v1/items/ordering", post(handlers::handle_ordering))
        .route("/api/v1/items/insertion", post(handlers::handle_insertion))
        .route("/api/v1/items/flow", post(handlers::handle_flow))
        // Gist family
        .route("/api/v1/items/title", post(handlers::handle_title))
        .route("/api/v1/items/topic", post(handlers::handle_topic))
        .route("/api/v1/items/claim", post(handlers::handle_claim))
        .route("/api/v1/items/main-idea", post(handlers::handle_main_idea))
        // Passage-comprehension items
        .route("/api/v1/items/summary", post(handlers::handle_summary))
        .route("/api/v1/items/detail", post(handlers::handle_detail))
        .route(
            "/api/v1/items/implication",
            post(handlers::handle_implication),
        )
        // Explicit persistence
        .route("/api/v1/items/save", post(handlers::handle_save))
        .with_state(state)
}
