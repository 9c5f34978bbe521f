//! Generation trait for the language-model backend.

use anyhow::Result;
use async_trait::async_trait;

/// A text-generation backend (e.g. Gemini `generateContent`).
///
/// Errors are expected and recoverable: the answer composer replaces any
/// failure with [`GENERATION_FALLBACK`](crate::messages::GENERATION_FALLBACK).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier reported in status output.
    fn model_name(&self) -> &str;

    /// Produce an answer for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
