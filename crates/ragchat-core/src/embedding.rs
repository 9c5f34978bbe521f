//! Embedding trait, hash-derived fallback vectors, and vector utilities.
//!
//! Concrete remote clients (HuggingFace inference API) live in the
//! `ragchat` app crate. This module owns what every backend agrees on:
//!
//! - [`EMBEDDING_DIMS`]: the fixed output contract (384 dimensions).
//! - [`hash_embedding`]: deterministic fallback vector from SHA-256.
//! - [`fit_dimensions`]: truncate/validate a remote payload to 384.
//! - [`cosine_similarity`], [`vec_to_blob`], [`blob_to_vec`], [`to_pgvector`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Output dimensionality of the embedding model (`BAAI/bge-small-en-v1.5`).
pub const EMBEDDING_DIMS: usize = 384;

/// Anything that can turn text into a vector.
///
/// Implementations decide their own failure behaviour; callers treat an
/// `Err` as "no embedding available".
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier reported in status output (e.g. `"BAAI/bge-small-en-v1.5"`).
    fn model_name(&self) -> &str;

    /// Embed a single, non-empty text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// What to do when the remote embedding call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingPolicy {
    /// Return the error to the caller.
    FailFast,
    /// Substitute [`hash_embedding`] for the failed call.
    HashFallback,
}

impl EmbeddingPolicy {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "hash-fallback" => Ok(Self::HashFallback),
            other => bail!(
                "Unknown embedding failure policy: '{}'. Must be fail-fast or hash-fallback.",
                other
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::HashFallback => "hash-fallback",
        }
    }
}

/// Deterministic 384-dimension vector derived from the SHA-256 of `text`.
///
/// Each dimension maps one hash byte into `[-1.0, 1.0]`
/// (`byte / 255 * 2 - 1`), cycling through the 32 hash bytes until the
/// vector is full. Identical input always yields a bit-identical vector.
pub fn hash_embedding(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    (0..EMBEDDING_DIMS)
        .map(|i| {
            let byte = digest[i % digest.len()];
            (byte as f32 / 255.0) * 2.0 - 1.0
        })
        .collect()
}

/// Truncate a remote embedding to [`EMBEDDING_DIMS`].
///
/// Fails if the payload is shorter than the contract requires.
pub fn fit_dimensions(mut vec: Vec<f32>) -> Result<Vec<f32>> {
    if vec.len() < EMBEDDING_DIMS {
        bail!(
            "embedding has {} dimensions, expected {}",
            vec.len(),
            EMBEDDING_DIMS
        );
    }
    vec.truncate(EMBEDDING_DIMS);
    Ok(vec)
}

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
///
/// ```rust
/// use ragchat_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Render a vector as a pgvector text literal: `[0.1,0.2,...]`.
pub fn to_pgvector(vec: &[f32]) -> String {
    let parts: Vec<String> = vec.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty, mismatched, or
/// zero-magnitude vectors.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
