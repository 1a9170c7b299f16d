use anyhow::{bail, Context, Result};

/// Which generative-text API backs the LLM client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackendKind {
    OpenAi,
    Gemini,
}

/// Application configuration loaded from environment variables.
/// Fails at startup with a message naming the missing variable.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: LlmBackendKind,
    pub llm_api_key: String,
    pub llm_model: String,
    /// Optional Postgres store for generated items.
    pub database_url: Option<String>,
    /// Optional spreadsheet-automation webhook store (used when no database).
    pub sheet_webhook_url: Option<String>,
    pub sheet_secret: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let backend = match std::env::var("LLM_BACKEND")
            .unwrap_or_else(|_| "openai".to_string())
            .to_lowercase()
            .as_str()
        {
            "openai" => LlmBackendKind::OpenAi,
            "gemini" => LlmBackendKind::Gemini,
            other => bail!("LLM_BACKEND must be 'openai' or 'gemini', got '{other}'"),
        };

        let (llm_api_key, llm_model) = match backend {
            LlmBackendKind::OpenAi => (
                require_env("OPENAI_API_KEY")?,
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            ),
            LlmBackendKind::Gemini => (
                require_env("GEMINI_API_KEY")?,
                std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            ),
        };

        let sheet_webhook_url = std::env::var("SHEET_WEBHOOK_URL").ok();
        let sheet_secret = std::env::var("SHEET_SECRET").ok();
        if sheet_secret.is_some() && sheet_webhook_url.is_none() {
            bail!("SHEET_SECRET is set but SHEET_WEBHOOK_URL is not");
        }

        Ok(Config {
            backend,
            llm_api_key,
            llm_model,
            database_url: std::env::var("DATABASE_URL").ok(),
            sheet_webhook_url,
            sheet_secret,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
