//! Axum route handlers for the item-generation API.
//!
//! Every handler has the same shape: validate the passage, run the item
//! type's orchestrator, save the result best-effort, return it. Wrong
//! methods get a 405 from axum's method routing.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;
use crate::items::blank::{self, BlankStyle};
use crate::items::gist::{self, GistKind};
use crate::items::{detail, flow, grammar, implication, insertion, ordering, summary, vocab};
use crate::items::{GeneratedItem, ItemRequest};
use crate::state::AppState;
use crate::store::ItemRecord;

fn validate_passage(request: &ItemRequest) -> Result<String, AppError> {
    let passage = request.text.trim();
    if passage.is_empty() {
        return Err(AppError::Validation(
            "text must be a non-empty string".to_string(),
        ));
    }
    Ok(passage.to_string())
}

/// Saves a finished item through the configured store. Failures are logged
/// and never fail the request that already produced a valid item.
async fn save_best_effort(state: &AppState, passage: &str, item: &GeneratedItem) {
    let record = ItemRecord::new(passage, &item.problem, &item.answer, &item.explanation);
    if let Err(e) = state.store.save(&record).await {
        warn!("best-effort save failed ({}): {e:#}", state.store.kind());
    }
}

macro_rules! item_handler {
    ($name:ident, $generate:expr) => {
        pub async fn $name(
            State(state): State<AppState>,
            Json(request): Json<ItemRequest>,
        ) -> Result<Json<GeneratedItem>, AppError> {
            let passage = validate_passage(&request)?;
            let item = ($generate)(&state.llm, &passage).await?;
            save_best_effort(&state, &passage, &item).await;
            Ok(Json(item))
        }
    };
}

item_handler!(handle_blank_word, |llm, p| blank::generate(
    llm,
    p,
    BlankStyle::Word
));
item_handler!(handle_blank_phrase, |llm, p| blank::generate(
    llm,
    p,
    BlankStyle::Phrase
));
item_handler!(handle_blank_clause, |llm, p| blank::generate(
    llm,
    p,
    BlankStyle::Clause
));
item_handler!(handle_grammar, grammar::generate);
item_handler!(handle_vocabulary, vocab::generate);
item_handler!(handle_ordering, ordering::generate);
item_handler!(handle_insertion, insertion::generate);
item_handler!(handle_summary, summary::generate);
item_handler!(handle_title, |llm, p| gist::generate(llm, p, GistKind::Title));
item_handler!(handle_topic, |llm, p| gist::generate(llm, p, GistKind::Topic));
item_handler!(handle_claim, |llm, p| gist::generate(llm, p, GistKind::Claim));
item_handler!(handle_main_idea, |llm, p| gist::generate(
    llm,
    p,
    GistKind::MainIdea
));
item_handler!(handle_detail, detail::generate);
item_handler!(handle_flow, flow::generate);
item_handler!(handle_implication, implication::generate);

/// Request body for the explicit save endpoint.
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub passage: String,
    pub problem: String,
    pub answer: String,
    pub explanation: String,
}

/// POST /api/v1/items/save
///
/// Explicitly persists a finished item. Unlike the automatic save after
/// generation, a store failure here is the whole point of the call and
/// surfaces as an error.
pub async fn handle_save(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.problem.trim().is_empty() {
        return Err(AppError::Validation(
            "problem must be a non-empty string".to_string(),
        ));
    }

    let record = ItemRecord::new(
        &request.passage,
        &request.problem,
        &request.answer,
        &request.explanation,
    );
    state
        .store
        .save(&record)
        .await
        .map_err(|e| AppError::Store(format!("{e:#}")))?;

    Ok(Json(serde_json::json!({
        "id": record.id,
        "saved": true,
        "store": state.store.kind(),
    })))
}
