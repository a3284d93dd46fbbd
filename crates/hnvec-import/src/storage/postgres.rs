//! Postgres adapter for the documents table (pgvector embeddings)

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};

use super::{DocumentStore, StoreError};
use crate::config::{DatabaseConfig, DATABASE_CONNECT_RETRY_DELAY};
use crate::models::NewDocument;

/// Documents repository backed by a shared connection pool
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_batch(&self, docs: &[NewDocument]) -> Result<u64, StoreError> {
        if docs.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO documents (hn_id, title, url, by, score, time, text, embedding) ",
        );

        query_builder.push_values(docs.iter(), |mut b, doc| {
            b.push_bind(doc.hn_id)
                .push_bind(&doc.title)
                .push_bind(&doc.url)
                .push_bind(&doc.by)
                .push_bind(doc.score)
                .push_bind(doc.time)
                .push_bind(&doc.text)
                .push_bind(vector_literal(&doc.embedding))
                .push_unseparated("::vector");
        });

        let result = query_builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Render an embedding in pgvector's text input format
fn vector_literal(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 10 + 2);
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
    out
}

/// Open a pool and ping it, retrying with a fixed delay while the database
/// container is still starting.
pub async fn connect_with_retry(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let attempts = config.connect_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.url)
            .await;

        match result {
            Ok(pool) => {
                info!(attempt, "Database connection pool established");
                return Ok(pool);
            },
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, error = %e, "Database not reachable yet, retrying");
                tokio::time::sleep(DATABASE_CONNECT_RETRY_DELAY).await;
                attempt += 1;
            },
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to connect to database after {attempts} attempts")));
            },
        }
    }
}
