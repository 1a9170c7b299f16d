use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{ItemRecord, ItemStore};

/// Postgres-backed item store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn save(&self, record: &ItemRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO generated_items (id, passage, problem, answer, explanation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(&record.passage)
        .bind(&record.problem)
        .bind(&record.answer)
        .bind(&record.explanation)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
