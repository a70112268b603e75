//! Embeddings support for semantic recall and duplicate detection.
//!
//! This module provides the [`Embedder`] trait and its two implementations:
//!
//! - [`HashEmbedder`]: deterministic bag-of-words random projection that works
//!   fully offline
//! - [`OpenAiEmbedder`]: calls the OpenAI embeddings endpoint through an
//!   injectable [`HttpTransport`]
//!
//! The two produce incompatible vector spaces. A failing remote call is an
//! error, never a silent switch to the local embedder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{EmbedError, Result};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, SharedTransport};

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the dimensionality of embeddings produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Get the name of this embedder.
    fn name(&self) -> &str;
}

/// A shared embedder that can be used across tasks.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Hash Embedder
// ─────────────────────────────────────────────────────────────────────────────

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const DIMENSION_SALT: u32 = 0x9e37_79b9;
const MIX_CONSTANT: u32 = 0x045d_9f3b;

/// Offline embedder: a random-projection bag of words.
///
/// Every whitespace token (lowercased) is hashed with FNV-1a and expanded into
/// a pseudo-random vector in `[-1, 1]^D`; the token vectors are summed and the
/// result is L2-normalized. Texts sharing many tokens end up close in cosine
/// space, and identical input always yields a bit-identical vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a hash embedder producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(local_embedding(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// 32-bit FNV-1a over the UTF-8 bytes of `token`.
pub fn fnv1a_32(token: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in token.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Pseudo-random component in `[-1, 1]` for a token hash and dimension index.
fn projection(token_hash: u32, index: usize) -> f32 {
    let mut x = token_hash ^ (index as u32).wrapping_mul(DIMENSION_SALT);
    x = ((x >> 16) ^ x).wrapping_mul(MIX_CONSTANT);
    x = ((x >> 16) ^ x).wrapping_mul(MIX_CONSTANT);
    x = (x >> 16) ^ x;
    (f64::from(x) / f64::from(u32::MAX) * 2.0 - 1.0) as f32
}

/// Compute the deterministic local embedding of `text`.
///
/// Empty or whitespace-only text yields the zero vector.
pub fn local_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimensions];

    let lowered = text.to_lowercase();
    for token in lowered.split_whitespace() {
        let hash = fnv1a_32(token);
        for (i, slot) in embedding.iter_mut().enumerate() {
            *slot += projection(hash, i);
        }
    }

    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for x in &mut embedding {
        *x /= norm;
    }

    embedding
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed embeddings endpoint.
pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Default embeddings model.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Default request timeout for remote embeddings.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for OpenAI embeddings.
#[derive(Clone)]
pub struct OpenAiEmbedderConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Endpoint URL.
    pub url: String,
    /// Model to use for embeddings.
    pub model: String,
    /// Requested output dimensions.
    pub dimensions: usize,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiEmbedderConfig {
    /// Create a config with the given API key and dimensions.
    pub fn new(api_key: impl Into<String>, dimensions: usize) -> Self {
        Self {
            api_key: api_key.into(),
            url: OPENAI_EMBEDDINGS_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimensions,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for OpenAiEmbedderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedderConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbedder {
    transport: SharedTransport,
    config: OpenAiEmbedderConfig,
}

impl OpenAiEmbedder {
    /// Create an embedder using the default `reqwest` transport.
    pub fn new(config: OpenAiEmbedderConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create an embedder using a caller-provided transport.
    pub fn with_transport(config: OpenAiEmbedderConfig, transport: SharedTransport) -> Self {
        Self { transport, config }
    }

    fn parse_response(&self, response: &HttpResponse) -> Result<Vec<f32>> {
        let parsed: std::result::Result<EmbeddingResponse, _> =
            serde_json::from_str(&response.body);

        if let Ok(EmbeddingResponse {
            error: Some(error), ..
        }) = &parsed
        {
            return Err(EmbedError::Provider(error.message.clone()));
        }

        if !response.is_success() {
            return Err(EmbedError::Http {
                status: response.status_code,
                body: response.body.chars().take(500).collect(),
            });
        }

        let embedding = parsed?
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::InvalidResponse("no embedding returned".to_string()))?;

        if embedding.len() != self.config.dimensions {
            return Err(EmbedError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            dimensions: self.config.dimensions,
        };
        let body = serde_json::to_string(&request)?;

        let http_request = HttpRequest::post_json(&self.config.url, body, self.config.timeout)
            .with_header("Authorization", format!("Bearer {}", self.config.api_key));

        let timeout = self.config.timeout;
        let response = tokio::time::timeout(timeout, self.transport.send(http_request))
            .await
            .map_err(|_| EmbedError::Timeout(timeout))??;

        debug!(
            status = response.status_code,
            bytes = response.body.len(),
            "embedding response received"
        );

        self.parse_response(&response)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, serde::Deserialize)]
struct ProviderError {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Factory
// ─────────────────────────────────────────────────────────────────────────────

/// What the memory layer needs to pick an embedder.
#[derive(Clone, Default)]
pub struct EmbedderSpec {
    /// Output dimensions.
    pub dimensions: usize,
    /// Remote credential; `None` selects the local hash embedder.
    pub api_key: Option<String>,
    /// Transport override for the remote embedder.
    pub transport: Option<SharedTransport>,
    /// Remote request timeout override.
    pub timeout: Option<Duration>,
}

/// Build a `SharedEmbedder` from a spec.
pub fn build_embedder(spec: &EmbedderSpec) -> Result<SharedEmbedder> {
    if spec.dimensions == 0 {
        return Err(EmbedError::Config(
            "embedding dimensions must be greater than 0".to_string(),
        ));
    }

    match spec.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(api_key) => {
            let mut config = OpenAiEmbedderConfig::new(api_key, spec.dimensions);
            if let Some(timeout) = spec.timeout {
                config = config.with_timeout(timeout);
            }
            let embedder = match &spec.transport {
                Some(transport) => OpenAiEmbedder::with_transport(config, Arc::clone(transport)),
                None => OpenAiEmbedder::new(config),
            };
            Ok(Arc::new(embedder))
        }
        None => Ok(Arc::new(HashEmbedder::new(spec.dimensions))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
