//! Knowledge-base ingestion.
//!
//! Loads a corpus (the built-in Navyakosh fertilizer documents or a JSON
//! file), embeds each document with the ingestion embedder and inserts it.
//! Documents are independent: an empty or failing document is counted and
//! skipped, the rest of the batch continues.
//!
//! Corpus file format:
//!
//! ```json
//! [
//!   { "content": "Navyakosh storage: ...", "metadata": { "type": "storage" } }
//! ]
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;

use ragchat_core::embedding::Embedder;
use ragchat_core::models::{Metadata, NewDocument};
use ragchat_core::store::Store;

use crate::config::Config;
use crate::context::AppContext;

const BUILTIN_CORPUS: &str = include_str!("../data/navyakosh.json");

/// Per-run ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.added + self.skipped + self.failed
    }
}

/// Why a single document could not be added.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document content must not be empty")]
    EmptyContent,
    #[error("failed to embed document: {0:#}")]
    Embedding(anyhow::Error),
    #[error("document store error: {0:#}")]
    Store(anyhow::Error),
}

/// The built-in Navyakosh fertilizer corpus.
pub fn builtin_corpus() -> Result<Vec<NewDocument>> {
    serde_json::from_str(BUILTIN_CORPUS).context("Built-in corpus is not valid JSON")
}

/// Read a corpus file (`[{"content": ..., "metadata": {...}}]`).
pub fn load_corpus_file(path: &Path) -> Result<Vec<NewDocument>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))
}

/// Embed and store a single document, returning its id.
pub async fn add_document(
    embedder: &dyn Embedder,
    store: &dyn Store,
    doc: &NewDocument,
) -> Result<String, IngestError> {
    let content = doc.content.trim();
    if content.is_empty() {
        return Err(IngestError::EmptyContent);
    }
    let embedding = embedder
        .embed(content)
        .await
        .map_err(IngestError::Embedding)?;
    store
        .insert(content, &embedding, &doc.metadata)
        .await
        .map_err(IngestError::Store)
}

/// Ingest every document in `docs`.
pub async fn ingest_corpus(
    embedder: &dyn Embedder,
    store: &dyn Store,
    docs: &[NewDocument],
) -> IngestReport {
    let mut report = IngestReport::default();

    for (i, doc) in docs.iter().enumerate() {
        if doc.content.trim().is_empty() {
            tracing::warn!(index = i, "skipping document with empty content");
            report.skipped += 1;
            continue;
        }

        match add_document(embedder, store, doc).await {
            Ok(id) => {
                tracing::debug!(index = i, id = %id, "document added");
                report.added += 1;
            }
            Err(e) => {
                tracing::warn!(index = i, error = %e, "failed to ingest document");
                report.failed += 1;
            }
        }
    }

    report
}

/// `ragchat ingest`: ensure the schema, optionally clear, then load a corpus.
pub async fn run_ingest(config: &Config, clear: bool, file: Option<&Path>) -> Result<()> {
    let docs = match file {
        Some(path) => load_corpus_file(path)?,
        None => builtin_corpus()?,
    };

    let ctx = AppContext::from_config(config).await?;

    if clear {
        let removed = ctx.store.delete_all().await?;
        println!("Cleared {} existing documents.", removed);
    }

    let report = ingest_corpus(ctx.ingest_embedder.as_ref(), ctx.store.as_ref(), &docs).await;
    ctx.close().await;

    println!("Ingestion summary:");
    println!("  added:   {}/{}", report.added, report.total());
    println!("  skipped: {}", report.skipped);
    println!("  failed:  {}", report.failed);
    println!("  model:   {}", config.embedding.model);

    Ok(())
}

/// `ragchat add`: embed and store one document.
pub async fn run_add(config: &Config, content: &str, metadata: Metadata) -> Result<()> {
    let ctx = AppContext::from_config(config).await?;
    let doc = NewDocument::new(content, metadata);
    let result = add_document(ctx.ingest_embedder.as_ref(), ctx.store.as_ref(), &doc).await;
    ctx.close().await;

    println!("Added document {}", result?);
    Ok(())
}

/// `ragchat clear`: delete every document and reset ids.
pub async fn run_clear(config: &Config) -> Result<()> {
    let ctx = AppContext::from_config(config).await?;
    let removed = ctx.store.delete_all().await;
    ctx.close().await;

    println!("Deleted {} documents from database", removed?);
    Ok(())
}
