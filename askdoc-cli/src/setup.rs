//! Wires providers, the vector store, and the pipeline from CLI settings.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use askdoc_rag::chat::ChatCompletionsProvider;
use askdoc_rag::huggingface::HuggingFaceEmbeddingProvider;
use askdoc_rag::{
    EmbeddingProvider, GenerationProvider, InMemoryVectorStore, MockEmbeddingProvider,
    MockGenerationProvider, QueryConfig, QueryPipeline, VectorStore,
};
use tracing::{info, warn};

use crate::cli::Cli;

/// Output size of the default embedding model.
const OFFLINE_DIMENSIONS: usize = 384;

type Providers = (Arc<dyn EmbeddingProvider>, Vec<Arc<dyn GenerationProvider>>);

/// Build the pipeline configuration from flags and environment.
pub fn query_config(cli: &Cli) -> anyhow::Result<QueryConfig> {
    let mut builder = QueryConfig::builder().expand_queries(cli.expand);
    if let Some(top_k) = cli.top_k {
        builder = builder.top_k(top_k);
    }
    builder.build().context("invalid query configuration")
}

fn chat_provider(
    provider: ChatCompletionsProvider,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn GenerationProvider>> {
    Ok(Arc::new(provider.with_timeout(timeout)?))
}

fn remote_providers(cli: &Cli, config: &QueryConfig) -> anyhow::Result<Providers> {
    let Some(hf_key) = cli.hf_api_key.as_deref().filter(|k| !k.is_empty()) else {
        bail!("HF_API_KEY is not set; pass --hf-api-key, set it in .env, or use --offline");
    };
    let timeout = config.request_timeout;

    let embedder = HuggingFaceEmbeddingProvider::new(hf_key)?.with_timeout(timeout)?;
    let mut chain = vec![chat_provider(ChatCompletionsProvider::huggingface(hf_key)?, timeout)?];

    match cli.openai_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => chain.push(chat_provider(ChatCompletionsProvider::openai(key)?, timeout)?),
        None => info!("OPENAI_API_KEY not set, running without a fallback chat model"),
    }

    Ok((Arc::new(embedder), chain))
}

fn offline_providers() -> Providers {
    let generator = MockGenerationProvider::new("offline")
        .with_default_reply("Offline mode: no language model is configured.");
    (Arc::new(MockEmbeddingProvider::new(OFFLINE_DIMENSIONS)), vec![Arc::new(generator)])
}

/// Which vector store the CLI searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// An empty in-memory index.
    InMemory,
    /// A Qdrant collection.
    Qdrant {
        /// gRPC URL of the Qdrant server.
        url: String,
        /// Collection holding the document chunks.
        collection: String,
    },
}

/// Pick the vector store for the configured `QDRANT_URL`.
///
/// # Errors
///
/// Fails when a URL is given but this binary was built without the `qdrant` feature.
pub fn store_backend(qdrant_url: Option<&str>, collection: &str) -> anyhow::Result<StoreBackend> {
    let Some(url) = qdrant_url.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(StoreBackend::InMemory);
    };
    if !cfg!(feature = "qdrant") {
        bail!("QDRANT_URL is set but askdoc was built without the `qdrant` feature");
    }
    Ok(StoreBackend::Qdrant { url: url.to_string(), collection: collection.to_string() })
}

#[cfg(feature = "qdrant")]
fn qdrant_store(
    url: &str,
    collection: &str,
    dimensions: usize,
) -> anyhow::Result<Arc<dyn VectorStore>> {
    info!(%url, %collection, "using qdrant vector store");
    let store = askdoc_rag::qdrant::QdrantVectorStore::new(url, collection, dimensions)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "qdrant"))]
fn qdrant_store(
    _url: &str,
    _collection: &str,
    _dimensions: usize,
) -> anyhow::Result<Arc<dyn VectorStore>> {
    bail!("askdoc was built without the `qdrant` feature")
}

fn vector_store(backend: &StoreBackend, dimensions: usize) -> anyhow::Result<Arc<dyn VectorStore>> {
    match backend {
        StoreBackend::Qdrant { url, collection } => qdrant_store(url, collection, dimensions),
        StoreBackend::InMemory => {
            warn!("QDRANT_URL not set, searching an empty in-memory index");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

/// Build a [`QueryPipeline`] from the parsed command line.
pub fn build_pipeline(cli: &Cli) -> anyhow::Result<QueryPipeline> {
    let config = query_config(cli)?;
    let backend = store_backend(cli.qdrant_url.as_deref(), &cli.collection)?;
    let (embedder, chain) =
        if cli.offline { offline_providers() } else { remote_providers(cli, &config)? };
    let store = vector_store(&backend, embedder.dimensions())?;

    QueryPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store)
        .generation_providers(chain)
        .build()
        .context("failed to build query pipeline")
}
