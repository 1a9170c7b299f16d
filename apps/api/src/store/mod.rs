//! Best-effort persistence of generated items.
//!
//! Two concrete backends exist: a Postgres table and a spreadsheet-
//! automation webhook. Neither is required; with no backend configured the
//! store is a no-op. Saves performed automatically after generation are
//! best-effort: a failure is logged and the request that already produced a
//! valid item still succeeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod postgres;
pub mod webhook;

/// A finished item as persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub id: Uuid,
    pub passage: String,
    pub problem: String,
    pub answer: String,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}

impl ItemRecord {
    pub fn new(passage: &str, problem: &str, answer: &str, explanation: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            passage: passage.to_string(),
            problem: problem.to_string(),
            answer: answer.to_string(),
            explanation: explanation.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn save(&self, record: &ItemRecord) -> anyhow::Result<()>;

    /// Short backend name for logging.
    fn kind(&self) -> &'static str;
}

/// Store used when no persistence backend is configured.
pub struct NoopStore;

#[async_trait]
impl ItemStore for NoopStore {
    async fn save(&self, _record: &ItemRecord) -> anyhow::Result<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "noop"
    }
}
