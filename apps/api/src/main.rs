mod config;
mod errors;
mod items;
mod llm_client;
mod routes;
mod state;
mod store;
mod text;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LlmBackendKind};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgStore;
use crate::store::webhook::SheetWebhookStore;
use crate::store::{ItemStore, NoopStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars).
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting itemforge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the LLM client for the configured backend.
    let llm = match config.backend {
        LlmBackendKind::OpenAi => {
            LlmClient::openai(config.llm_api_key.clone(), config.llm_model.clone())
        }
        LlmBackendKind::Gemini => {
            LlmClient::gemini(config.llm_api_key.clone(), config.llm_model.clone())
        }
    };
    info!("LLM client initialized (model: {})", llm.model());

    // Select the persistence backend: Postgres when configured, otherwise
    // the spreadsheet webhook, otherwise a no-op.
    let store: Arc<dyn ItemStore> = if let Some(database_url) = &config.database_url {
        Arc::new(PgStore::connect(database_url).await?)
    } else if let Some(url) = &config.sheet_webhook_url {
        Arc::new(SheetWebhookStore::new(
            url.clone(),
            config.sheet_secret.clone(),
        ))
    } else {
        info!("no persistence backend configured; generated items are not saved");
        Arc::new(NoopStore)
    };
    info!("item store initialized ({})", store.kind());

    let state = AppState {
        llm,
        store,
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
