//! Embedding clients.
//!
//! - **[`HuggingFaceEmbedder`]**: calls the HuggingFace inference API
//!   (`POST {url}/models/{model}`) one text per request, with
//!   retry and backoff.
//! - **[`HashEmbedder`]**: offline, deterministic SHA-256 derived vectors.
//! - **[`PolicyEmbedder`]**: wraps any [`Embedder`] with an
//!   [`EmbeddingPolicy`]: either pass failures through or replace them with
//!   the hash vector.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error, model loading) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, ... (capped at 2^5)
//! - `timeout_secs` bounds the whole call, retries and backoff included

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use ragchat_core::embedding::{fit_dimensions, hash_embedding, Embedder, EmbeddingPolicy};

use crate::config::{Config, EmbeddingConfig};

// ============ HuggingFace ============

/// Client for the HuggingFace feature-extraction endpoint.
pub struct HuggingFaceEmbedder {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    token: Option<String>,
    max_retries: u32,
    timeout: Duration,
}

impl HuggingFaceEmbedder {
    pub fn new(config: &EmbeddingConfig, token: Option<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = format!(
            "{}/models/{}",
            config.url.trim_end_matches('/'),
            config.model
        );
        if token.is_none() {
            tracing::warn!("HUGGINGFACE_API_TOKEN is not set; remote embedding calls will fail");
        }
        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
            token,
            max_retries: config.max_retries,
            timeout,
        })
    }

    async fn embed_with_retries(&self, token: &str, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({ "inputs": text });
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", token))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_embedding_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow!("Embedding API error {}: {}", status, body_text));
                        continue;
                    }

                    bail!("Embedding API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow!("Embedding request failed: {}", e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("HUGGINGFACE_API_TOKEN not set"))?;

        tokio::time::timeout(self.timeout, self.embed_with_retries(token, text))
            .await
            .map_err(|_| {
                anyhow!(
                    "Embedding request timed out after {}s",
                    self.timeout.as_secs()
                )
            })?
    }
}

/// Parse the feature-extraction response.
///
/// Accepts a flat array of numbers or a nested array (takes the first
/// row), then truncates to the embedding dimensionality.
pub fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let outer = json
        .as_array()
        .ok_or_else(|| anyhow!("Invalid embedding response: expected a JSON array"))?;

    let row = match outer.first() {
        Some(serde_json::Value::Array(inner)) => inner,
        Some(_) => outer,
        None => bail!("Invalid embedding response: empty array"),
    };

    let vec = row
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow!("Invalid embedding response: non-numeric value"))
        })
        .collect::<Result<Vec<f32>>>()?;

    fit_dimensions(vec)
}

// ============ Hash ============

/// Offline embedder producing [`hash_embedding`] vectors.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "sha256-hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text))
    }
}

// ============ Policy wrapper ============

/// Applies an [`EmbeddingPolicy`] to an inner embedder.
pub struct PolicyEmbedder {
    inner: Arc<dyn Embedder>,
    policy: EmbeddingPolicy,
}

impl PolicyEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, policy: EmbeddingPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> EmbeddingPolicy {
        self.policy
    }
}

#[async_trait]
impl Embedder for PolicyEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.inner.embed(text).await {
            Ok(vec) => Ok(vec),
            Err(e) => match self.policy {
                EmbeddingPolicy::FailFast => Err(e),
                EmbeddingPolicy::HashFallback => {
                    tracing::warn!(error = %e, "embedding failed, using hash fallback");
                    Ok(hash_embedding(text))
                }
            },
        }
    }
}

/// Build the shared remote (or hash) embedder from configuration.
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.provider.as_str() {
        "huggingface" => Ok(Arc::new(HuggingFaceEmbedder::new(
            &config.embedding,
            config.credentials.huggingface_token.clone(),
        )?)),
        "hash" => Ok(Arc::new(HashEmbedder)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::embedding::EMBEDDING_DIMS;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            url: url.to_string(),
            max_retries: 0,
            timeout_secs: 5,
            ..EmbeddingConfig::default()
        }
    }

    struct Failing;

    #[async_trait]
    impl Embedder for Failing {
        fn model_name(&self) -> &str {
            "failing"
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            bail!("upstream down")
        }
    }

    #[test]
    fn test_parse_flat_array() {
        let json = json!(vec![0.25; 384]);
        let v = parse_embedding_response(&json).unwrap();
        assert_eq!(v.len(), EMBEDDING_DIMS);
        assert_eq!(v[0], 0.25);
    }

    #[test]
    fn test_parse_nested_takes_first_row() {
        let json = json!([vec![0.5; 384], vec![-0.5; 384]]);
        let v = parse_embedding_response(&json).unwrap();
        assert!(v.iter().all(|x| *x == 0.5));
    }

    #[test]
    fn test_parse_truncates_long_rows() {
        let json = json!(vec![0.1; 1024]);
        assert_eq!(parse_embedding_response(&json).unwrap().len(), 384);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_embedding_response(&json!({"error": "loading"})).is_err());
        assert!(parse_embedding_response(&json!([])).is_err());
        assert!(parse_embedding_response(&json!(vec![0.1; 12])).is_err());
        assert!(parse_embedding_response(&json!(["a", "b"])).is_err());
    }

    #[tokio::test]
    async fn test_remote_embedding_sends_token_and_inputs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/BAAI/bge-small-en-v1.5"))
            .and(header("Authorization", "Bearer hf_test"))
            .and(body_json(json!({"inputs": "storage advice"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(vec![0.2; 384])))
            .expect(1)
            .mount(&server)
            .await;

        let embedder =
            HuggingFaceEmbedder::new(&test_config(&server.uri()), Some("hf_test".to_string()))
                .unwrap();
        let v = embedder.embed("storage advice").await.unwrap();
        assert_eq!(v.len(), EMBEDDING_DIMS);
    }

    #[tokio::test]
    async fn test_remote_embedding_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let embedder =
            HuggingFaceEmbedder::new(&test_config(&server.uri()), Some("nope".to_string()))
                .unwrap();
        let err = embedder.embed("anything").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_timeout_bounds_whole_call_including_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let config = EmbeddingConfig {
            url: server.uri(),
            max_retries: 2,
            timeout_secs: 1,
            ..EmbeddingConfig::default()
        };
        let embedder = HuggingFaceEmbedder::new(&config, Some("t".to_string())).unwrap();

        let started = std::time::Instant::now();
        let err = embedder.embed("slow upstream").await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
        assert!(err.to_string().contains("timed out"), "{}", err);
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(vec![0.2; 384])))
            .expect(0)
            .mount(&server)
            .await;

        let embedder = HuggingFaceEmbedder::new(&test_config(&server.uri()), None).unwrap();
        assert!(embedder.embed("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_fail_fast_policy_propagates() {
        let embedder = PolicyEmbedder::new(Arc::new(Failing), EmbeddingPolicy::FailFast);
        assert!(embedder.embed("query").await.is_err());
    }

    #[tokio::test]
    async fn test_hash_fallback_policy_recovers() {
        let embedder = PolicyEmbedder::new(Arc::new(Failing), EmbeddingPolicy::HashFallback);
        let v = embedder.embed("query").await.unwrap();
        assert_eq!(v, hash_embedding("query"));
    }

    #[tokio::test]
    async fn test_hash_fallback_on_bad_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "loading"})))
            .mount(&server)
            .await;

        let remote: Arc<dyn Embedder> = Arc::new(
            HuggingFaceEmbedder::new(&test_config(&server.uri()), Some("t".to_string())).unwrap(),
        );
        let embedder = PolicyEmbedder::new(remote, EmbeddingPolicy::HashFallback);
        let v = embedder.embed("Navyakosh").await.unwrap();
        assert_eq!(v, hash_embedding("Navyakosh"));
    }
}
