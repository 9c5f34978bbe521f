//! Database connection management.
//!
//! `db.url` selects the backend:
//!
//! | Scheme | Backend | Similarity ranking |
//! |--------|---------|--------------------|
//! | `postgres://`, `postgresql://` | PostgreSQL + pgvector | `<=>` cosine distance operator |
//! | `sqlite:` | SQLite (WAL mode) | cosine similarity computed in Rust |
//!
//! Connections come from an `sqlx` pool; reuse is left to the driver.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ragchat_core::store::Store;

use crate::config::Config;
use crate::migrate;
use crate::pg_store::PgStore;
use crate::sqlite_store::SqliteStore;

/// A connection pool for whichever backend `db.url` names.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl DbPool {
    pub fn backend_name(&self) -> &'static str {
        match self {
            DbPool::Sqlite(_) => "sqlite",
            DbPool::Postgres(_) => "postgres",
        }
    }

    pub async fn close(&self) {
        match self {
            DbPool::Sqlite(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
        }
    }
}

/// Open a pool for the configured database.
///
/// For SQLite the database file and its parent directories are created if
/// they don't exist.
pub async fn connect(config: &Config) -> Result<DbPool> {
    let url = config.db.url.as_str();

    if let Some(path) = url.strip_prefix("sqlite:") {
        let path = path.trim_start_matches("//");
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.db.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database: {}", path))?;
        return Ok(DbPool::Sqlite(pool));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .connect(url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    Ok(DbPool::Postgres(pool))
}

/// Connect, make sure the schema exists, and wrap the pool in a [`Store`].
pub async fn open_store(config: &Config) -> Result<(DbPool, Arc<dyn Store>)> {
    let pool = connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store: Arc<dyn Store> = match &pool {
        DbPool::Sqlite(p) => Arc::new(SqliteStore::new(p.clone())),
        DbPool::Postgres(p) => Arc::new(PgStore::new(p.clone())),
    };
    tracing::debug!(backend = pool.backend_name(), "document store ready");
    Ok((pool, store))
}
