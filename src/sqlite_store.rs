//! SQLite-backed [`Store`] implementation.
//!
//! Embeddings are stored as little-endian f32 BLOBs. SQLite has no vector
//! operator, so [`Store::query_nearest`] reads every row with a
//! correctly-sized embedding and ranks by cosine similarity in Rust.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ragchat_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, EMBEDDING_DIMS};
use ragchat_core::models::{Metadata, ScoredDocument};
use ragchat_core::store::{check_dimensions, rank_by_similarity, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_metadata(raw: &str) -> Metadata {
    serde_json::from_str(raw).unwrap_or_default()
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Metadata,
    ) -> Result<String> {
        check_dimensions(embedding)?;
        let now = chrono::Utc::now().timestamp();
        let metadata_json = serde_json::to_string(metadata)?;

        let result = sqlx::query(
            r#"
            INSERT INTO documents (content, embedding, metadata_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(content)
        .bind(vec_to_blob(embedding))
        .bind(&metadata_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid().to_string())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, embedding, metadata_json
            FROM documents
            WHERE embedding IS NOT NULL AND length(embedding) = ?
            ORDER BY id ASC
            "#,
        )
        .bind((EMBEDDING_DIMS * 4) as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ScoredDocument> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let stored = blob_to_vec(&blob);
                let id: i64 = row.get("id");
                let metadata_json: String = row.get("metadata_json");
                ScoredDocument {
                    id: id.to_string(),
                    content: row.get("content"),
                    metadata: parse_metadata(&metadata_json),
                    similarity: cosine_similarity(embedding, &stored) as f64,
                }
            })
            .collect();

        rank_by_similarity(&mut scored);
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // AUTOINCREMENT keeps its high-water mark here
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'documents'")
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
