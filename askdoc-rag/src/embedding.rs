//! Embedding providers and the retrying [`Embedder`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::QueryConfig;
use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. Errors should set `transient` on [`RagError::EmbeddingError`]
/// when the upstream failure is server-side, so [`Embedder`] knows whether a
/// retry can help.
///
/// # Example
///
/// ```rust,ignore
/// use askdoc_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// The shapes a feature-extraction endpoint may answer with.
///
/// Some endpoints return a flat vector, others wrap a single input in a batch.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EmbeddingPayload {
    /// `[0.1, 0.2, ...]`
    Flat(Vec<f32>),
    /// `[[0.1, 0.2, ...]]`
    Batched(Vec<Vec<f32>>),
}

impl EmbeddingPayload {
    /// Collapse the payload into a single flat vector.
    ///
    /// A batch yields its first vector; an empty batch yields an empty vector.
    pub fn into_flat(self) -> Vec<f32> {
        match self {
            Self::Flat(vector) => vector,
            Self::Batched(batch) => batch.into_iter().next().unwrap_or_default(),
        }
    }
}

/// Embeds query text with bounded retries.
///
/// Never fails: an empty vector signals that no embedding could be produced,
/// either because the provider rejected the input or because every attempt
/// hit a transient failure.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl Embedder {
    /// Wrap a provider using the retry settings from `config`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &QueryConfig) -> Self {
        Self {
            provider,
            attempts: config.embed_attempts.max(1),
            retry_delay: config.embed_retry_delay,
            timeout: config.request_timeout,
        }
    }

    /// Return a reference to the wrapped provider.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embed `text`, returning an empty vector on failure.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        for attempt in 1..=self.attempts {
            match self.embed_once(text).await {
                Ok(vector) => {
                    debug!(attempt, dimensions = vector.len(), "embedded query text");
                    return vector;
                }
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "transient embedding failure, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) if e.is_transient() => {
                    error!(attempts = self.attempts, error = %e, "embedding retries exhausted");
                }
                Err(e) => {
                    error!(error = %e, "embedding failed, not retrying");
                    return Vec::new();
                }
            }
        }
        Vec::new()
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::timeout(self.timeout, self.provider.embed(text))
            .await
            .map_err(|_| RagError::Timeout { operation: "embedding".into(), after: self.timeout })?
    }
}
