//! PostgreSQL + pgvector [`Store`] implementation.
//!
//! Ranking is delegated to pgvector: `embedding <=> $1` is the cosine
//! distance, and similarity is reported as `1 - distance`. Vectors cross
//! the wire as pgvector text literals (`[0.1,0.2,...]`) cast with
//! `::vector`, so no client-side vector type is needed.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use ragchat_core::embedding::to_pgvector;
use ragchat_core::models::{Metadata, ScoredDocument};
use ragchat_core::store::{check_dimensions, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Metadata,
    ) -> Result<String> {
        check_dimensions(embedding)?;
        let metadata_json = serde_json::to_string(metadata)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO documents (content, embedding, doc_metadata)
            VALUES ($1, $2::vector, $3::jsonb)
            RETURNING id
            "#,
        )
        .bind(content)
        .bind(to_pgvector(embedding))
        .bind(&metadata_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.to_string())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id,
                   content,
                   doc_metadata::text AS metadata_json,
                   (1 - (embedding <=> $1::vector))::float8 AS similarity
            FROM documents
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1::vector ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(to_pgvector(embedding))
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        let docs = rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                let metadata_json: Option<String> = row.get("metadata_json");
                ScoredDocument {
                    id: id.to_string(),
                    content: row.get("content"),
                    metadata: metadata_json
                        .and_then(|raw| serde_json::from_str(&raw).ok())
                        .unwrap_or_default(),
                    similarity: row.get("similarity"),
                }
            })
            .collect();

        Ok(docs)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("ALTER SEQUENCE documents_id_seq RESTART WITH 1")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}
