//! Hugging Face embedding provider using the inference router's
//! feature-extraction pipeline.
//!
//! This module is only available when the `huggingface` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use crate::embedding::{EmbeddingPayload, EmbeddingProvider};
use crate::error::{RagError, Result};

/// The default sentence-embedding model.
const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// The dimensionality of `all-MiniLM-L6-v2`.
const DEFAULT_DIMENSIONS: usize = 384;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const PROVIDER: &str = "HuggingFace";

fn feature_extraction_url(model: &str) -> String {
    format!("https://router.huggingface.co/hf-inference/models/{model}/pipeline/feature-extraction")
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| RagError::EmbeddingError {
        provider: PROVIDER.into(),
        message: format!("failed to build HTTP client: {e}"),
        transient: false,
    })
}

/// An [`EmbeddingProvider`] backed by the Hugging Face inference router.
///
/// Server-side failures (5xx, transport errors, timeouts) are reported as
/// transient so [`Embedder`](crate::Embedder) retries them; 4xx responses and
/// unexpected payloads are not.
///
/// # Example
///
/// ```rust,ignore
/// use askdoc_rag::huggingface::HuggingFaceEmbeddingProvider;
///
/// let provider = HuggingFaceEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), 384);
/// ```
pub struct HuggingFaceEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    dimensions: usize,
}

impl HuggingFaceEmbeddingProvider {
    /// Create a provider for `all-MiniLM-L6-v2` with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "API key must not be empty".into(),
                transient: false,
            });
        }

        Ok(Self {
            client: http_client(DEFAULT_TIMEOUT)?,
            api_key,
            endpoint: feature_extraction_url(DEFAULT_MODEL),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a provider using the `HF_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("HF_API_KEY").map_err(|_| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "HF_API_KEY environment variable not set".into(),
            transient: false,
        })?;
        Self::new(api_key)
    }

    /// Use another feature-extraction model with the given output size.
    pub fn with_model(mut self, model: &str, dimensions: usize) -> Self {
        self.endpoint = feature_extraction_url(model);
        self.dimensions = dimensions;
        self
    }

    /// Send requests to a custom endpoint (self-hosted TEI, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(timeout)?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&FeatureExtractionRequest { inputs: text })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                    transient: true,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {body}"),
                transient: status.is_server_error(),
            });
        }

        let payload: EmbeddingPayload = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "unexpected embedding format");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("unexpected embedding format: {e}"),
                transient: false,
            }
        })?;

        let embedding = payload.into_flat();
        if embedding.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "API returned an empty embedding".into(),
                transient: false,
            });
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
