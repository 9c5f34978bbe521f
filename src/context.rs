//! Shared application context.
//!
//! Built once per process from a [`Config`] and handed to every command and
//! request handler. Holds the store, the two policy-wrapped embedders and
//! the generator.

use anyhow::Result;
use std::sync::Arc;

use ragchat_core::embedding::Embedder;
use ragchat_core::generate::Generator;
use ragchat_core::store::Store;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::embedding::{create_embedder, PolicyEmbedder};
use crate::llm::create_generator;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    /// Embedder for `/chat` and `ask` (`embedding.serve_policy`).
    pub query_embedder: Arc<dyn Embedder>,
    /// Embedder for ingestion and `POST /documents` (`embedding.ingest_policy`).
    pub ingest_embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pool: Option<DbPool>,
}

impl AppContext {
    /// Assemble a context from ready-made parts (no database pool to close).
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        query_embedder: Arc<dyn Embedder>,
        ingest_embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config,
            store,
            query_embedder,
            ingest_embedder,
            generator,
            pool: None,
        }
    }

    /// Connect to the database, ensure the schema and build the clients.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let (pool, store) = db::open_store(config).await?;

        let remote = create_embedder(config)?;
        let query_embedder: Arc<dyn Embedder> = Arc::new(PolicyEmbedder::new(
            remote.clone(),
            config.embedding.serve_policy()?,
        ));
        let ingest_embedder: Arc<dyn Embedder> = Arc::new(PolicyEmbedder::new(
            remote,
            config.embedding.ingest_policy()?,
        ));
        let generator = create_generator(config)?;

        tracing::info!(
            backend = pool.backend_name(),
            embedding_model = query_embedder.model_name(),
            generation_model = generator.model_name(),
            "application context ready"
        );

        Ok(Self {
            config: config.clone(),
            store,
            query_embedder,
            ingest_embedder,
            generator,
            pool: Some(pool),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.pool
            .as_ref()
            .map(DbPool::backend_name)
            .unwrap_or("memory")
    }

    /// Close the database pool, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
