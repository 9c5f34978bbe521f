//! In-memory [`Store`] implementation for tests and local demos.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`. Vector search is
//! brute-force cosine similarity over all stored vectors.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, EMBEDDING_DIMS};
use crate::models::{Document, Metadata, ScoredDocument};

use super::{check_dimensions, rank_by_similarity, Store};

struct Inner {
    docs: Vec<Document>,
    next_id: i64,
}

/// In-memory document store.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                docs: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Metadata,
    ) -> Result<String> {
        check_dimensions(embedding)?;
        let now = chrono::Utc::now().timestamp();
        let mut inner = self.inner.write().map_err(poisoned)?;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.docs.push(Document {
            id,
            content: content.to_string(),
            embedding: embedding.to_vec(),
            metadata: metadata.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(id.to_string())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut scored: Vec<ScoredDocument> = inner
            .docs
            .iter()
            .filter(|d| d.embedding.len() == EMBEDDING_DIMS)
            .map(|d| ScoredDocument {
                id: d.id.to_string(),
                content: d.content.clone(),
                metadata: d.metadata.clone(),
                similarity: cosine_similarity(embedding, &d.embedding) as f64,
            })
            .collect();
        rank_by_similarity(&mut scored);
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let removed = inner.docs.len() as u64;
        inner.docs.clear();
        inner.next_id = 1;
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.docs.len() as u64)
    }
}
