//! Storage abstraction for documents and their embeddings.
//!
//! The [`Store`] trait is the contract the retriever and ingestion path
//! depend on. Similarity ranking belongs to the backend: PostgreSQL uses
//! pgvector's `<=>` operator, SQLite and the in-memory store compute cosine
//! similarity over every stored vector.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::EMBEDDING_DIMS;
use crate::models::{Metadata, ScoredDocument};

/// Abstract document store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](Store::insert) | Store a document with its embedding, returning the new id |
/// | [`query_nearest`](Store::query_nearest) | Top-`k` documents by cosine similarity |
/// | [`delete_all`](Store::delete_all) | Empty the store and reset the id sequence |
/// | [`count`](Store::count) | Number of stored documents |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a document. The embedding must have exactly
    /// [`EMBEDDING_DIMS`] entries.
    async fn insert(&self, content: &str, embedding: &[f32], metadata: &Metadata)
        -> Result<String>;

    /// Return at most `k` documents ordered by descending similarity.
    /// Ties keep insertion order. Documents without a valid embedding are
    /// never returned.
    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>>;

    /// Remove every document, reset the id sequence, and return how many
    /// rows were removed.
    async fn delete_all(&self) -> Result<u64>;

    /// Number of stored documents.
    async fn count(&self) -> Result<u64>;
}

/// Reject embeddings that break the dimensionality invariant.
pub fn check_dimensions(embedding: &[f32]) -> Result<()> {
    if embedding.len() != EMBEDDING_DIMS {
        bail!(
            "embedding has {} dimensions, store requires {}",
            embedding.len(),
            EMBEDDING_DIMS
        );
    }
    Ok(())
}

/// Sort by similarity descending. The sort is stable, so rows that arrive
/// in insertion order keep it on ties.
pub fn rank_by_similarity(docs: &mut [ScoredDocument]) {
    docs.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
