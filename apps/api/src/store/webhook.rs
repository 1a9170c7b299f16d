use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use super::{ItemRecord, ItemStore};

/// Spreadsheet-automation webhook store. Posts each record as JSON to a
/// script endpoint; the optional shared secret rides in the body.
pub struct SheetWebhookStore {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl SheetWebhookStore {
    pub fn new(url: String, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            url,
            secret,
        }
    }
}

#[async_trait]
impl ItemStore for SheetWebhookStore {
    async fn save(&self, record: &ItemRecord) -> Result<()> {
        let body = json!({
            "passage": record.passage,
            "problem": record.problem,
            "answer": record.answer,
            "explanation": record.explanation,
            "secret": self.secret,
        });

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("webhook returned {status}: {text}"));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "sheet-webhook"
    }
}
