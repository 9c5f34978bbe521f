//! Idempotent schema setup.
//!
//! Every statement is guarded with `IF NOT EXISTS` or `IF EXISTS`, so
//! [`run_migrations`] and [`apply_schema`] are safe to call on every start
//! and before every ingestion run.

use anyhow::{Context, Result};

use ragchat_core::embedding::EMBEDDING_DIMS;

use crate::config::Config;
use crate::db::{self, DbPool};

/// Create the database (if needed) and its schema, then close the pool.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the documents table and its similarity index if absent.
pub async fn apply_schema(pool: &DbPool) -> Result<()> {
    match pool {
        DbPool::Sqlite(pool) => {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS documents (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    content TEXT NOT NULL,
                    embedding BLOB,
                    metadata_json TEXT NOT NULL DEFAULT '{}',
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )
                "#,
            )
            .execute(pool)
            .await
            .context("Failed to create documents table")?;

            sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at)",
            )
            .execute(pool)
            .await?;
        }
        DbPool::Postgres(pool) => {
            sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
                .execute(pool)
                .await
                .context("Failed to enable the pgvector extension")?;

            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS documents (
                    id BIGSERIAL PRIMARY KEY,
                    content TEXT NOT NULL,
                    embedding vector({dims}),
                    doc_metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )
                "#,
                dims = EMBEDDING_DIMS
            ))
            .execute(pool)
            .await
            .context("Failed to create documents table")?;

            // Replaces the older ivfflat index, which misses rows when
            // trained on an empty table.
            sqlx::query("DROP INDEX IF EXISTS documents_embedding_idx")
                .execute(pool)
                .await?;

            sqlx::query(
                r#"
                CREATE INDEX IF NOT EXISTS documents_embedding_hnsw_idx
                ON documents USING hnsw (embedding vector_cosine_ops)
                "#,
            )
            .execute(pool)
            .await
            .context("Failed to create similarity index")?;
        }
    }
    Ok(())
}
