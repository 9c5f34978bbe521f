//! Test doubles shared by the pipeline and HTTP tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ragchat::config::Config;
use ragchat::context::AppContext;
use ragchat::ingest::{builtin_corpus, ingest_corpus};
use ragchat_core::embedding::{Embedder, EMBEDDING_DIMS};
use ragchat_core::generate::Generator;
use ragchat_core::models::{Metadata, ScoredDocument};
use ragchat_core::prompt::DOCUMENT_DELIMITER;
use ragchat_core::store::memory::InMemoryStore;
use ragchat_core::store::Store;

/// Bag-of-words embedder: every distinct lowercase word gets its own
/// dimension, so cosine similarity reflects shared vocabulary.
#[derive(Default)]
pub struct VocabEmbedder {
    vocab: Mutex<HashMap<String, usize>>,
    pub calls: AtomicUsize,
}

impl VocabEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for VocabEmbedder {
    fn model_name(&self) -> &str {
        "vocab"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vocab = self.vocab.lock().unwrap();
        let mut v = vec![0.0; EMBEDDING_DIMS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocab.len();
            let idx = *vocab.entry(word.to_string()).or_insert(next);
            v[idx % EMBEDDING_DIMS] += 1.0;
        }
        Ok(v)
    }
}

#[derive(Default)]
pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("embedding service unavailable")
    }
}

/// Answers with the first context document, minus its relevance prefix.
#[derive(Default)]
pub struct EchoGenerator {
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl EchoGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        let context = prompt
            .split_once("Context:\n")
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        let first = context.split(DOCUMENT_DELIMITER).next().unwrap_or_default();
        let answer: Vec<&str> = first
            .lines()
            .filter(|l| !l.starts_with("[Relevance"))
            .take_while(|l| !l.is_empty())
            .collect();
        Ok(answer.join("\n"))
    }
}

#[derive(Default)]
pub struct FailingGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("Generation API error 503 Service Unavailable: overloaded")
    }
}

/// Wraps the in-memory store and counts every call.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    pub calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn insert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Metadata,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(content, embedding, metadata).await
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query_nearest(embedding, k).await
    }

    async fn delete_all(&self) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_all().await
    }

    async fn count(&self) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count().await
    }
}

/// A store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl Store for BrokenStore {
    async fn insert(&self, _: &str, _: &[f32], _: &Metadata) -> Result<String> {
        bail!("connection refused")
    }
    async fn query_nearest(&self, _: &[f32], _: usize) -> Result<Vec<ScoredDocument>> {
        bail!("connection refused")
    }
    async fn delete_all(&self) -> Result<u64> {
        bail!("connection refused")
    }
    async fn count(&self) -> Result<u64> {
        bail!("connection refused")
    }
}

/// A store whose lookups panic, as a driver bug would.
pub struct PanickingStore;

#[async_trait]
impl Store for PanickingStore {
    async fn insert(&self, _: &str, _: &[f32], _: &Metadata) -> Result<String> {
        panic!("row decode failed")
    }
    async fn query_nearest(&self, _: &[f32], _: usize) -> Result<Vec<ScoredDocument>> {
        panic!("row decode failed")
    }
    async fn delete_all(&self) -> Result<u64> {
        panic!("row decode failed")
    }
    async fn count(&self) -> Result<u64> {
        panic!("row decode failed")
    }
}

pub struct Harness {
    pub ctx: AppContext,
    pub embedder: Arc<VocabEmbedder>,
    pub generator: Arc<EchoGenerator>,
    pub store: Arc<CountingStore>,
}

/// A context over fresh fakes; `ingest` loads the built-in corpus first.
pub async fn harness(ingest: bool) -> Harness {
    let embedder = Arc::new(VocabEmbedder::default());
    let generator = Arc::new(EchoGenerator::default());
    let store = Arc::new(CountingStore::default());

    if ingest {
        let docs = builtin_corpus().unwrap();
        let report = ingest_corpus(embedder.as_ref(), store.as_ref(), &docs).await;
        assert_eq!(report.added, 8);
        store.calls.store(0, Ordering::SeqCst);
        embedder.calls.store(0, Ordering::SeqCst);
    }

    let ctx = AppContext::new(
        Config::default(),
        store.clone(),
        embedder.clone(),
        embedder.clone(),
        generator.clone(),
    );

    Harness {
        ctx,
        embedder,
        generator,
        store,
    }
}
