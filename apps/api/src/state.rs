use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::store::ItemStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. There is no mutable state here: the LLM client and store
/// are the only collaborators a request touches.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    /// Best-effort persistence backend selected at startup.
    pub store: Arc<dyn ItemStore>,
    pub config: Config,
}
