//! Query pipeline orchestrator.
//!
//! The [`QueryPipeline`] answers a question end to end:
//!
//! 1. cache lookup
//! 2. scope routing (active document, named document, or whole corpus)
//! 3. optional multi-query expansion
//! 4. embedding and nearest-neighbour search per query variant
//! 5. scope-dependent relevance filtering
//! 6. grounded or conversational generation through a provider chain
//! 7. cache store
//!
//! [`process_query`](QueryPipeline::process_query) is total: every collaborator
//! failure degrades to a best-effort [`Answer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use askdoc_rag::{InMemoryVectorStore, QueryConfig, QueryPipeline};
//!
//! let pipeline = QueryPipeline::builder()
//!     .config(QueryConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generation_provider(Arc::new(primary))
//!     .generation_provider(Arc::new(fallback))
//!     .build()?;
//!
//! let answer = pipeline.process_query("What is the invoice number?", None).await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{AnswerCache, CacheKey, MokaAnswerCache};
use crate::config::QueryConfig;
use crate::document::{Answer, QueryRequest};
use crate::embedding::{Embedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::expander::{Expansion, QueryExpander};
use crate::generation::{GenerationProvider, ProviderChain, ResponseGenerator};
use crate::relevance::RelevancePolicy;
use crate::retrieval::Retriever;
use crate::scope::ScopeRouter;
use crate::vectorstore::VectorStore;

const EMPTY_QUESTION_REPLY: &str = "Please ask a question so I can search your documents.";

const HEALTH_PROMPT: &str = "Reply with the single word OK.";

/// Await `future`, failing with [`RagError::Timeout`] after `timeout`.
async fn within<T>(
    timeout: Duration,
    operation: &str,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| RagError::Timeout { operation: operation.to_string(), after: timeout })?
}

/// Reachability of one collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum ComponentStatus {
    /// The collaborator answered.
    Reachable,
    /// The collaborator failed; the reason is included.
    Unreachable(String),
}

impl ComponentStatus {
    fn from_result<T>(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::Reachable,
            Err(e) => Self::Unreachable(e.to_string()),
        }
    }

    /// Whether the collaborator answered.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

/// Status of every collaborator the pipeline depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// The embedding provider.
    pub embedder: ComponentStatus,
    /// The vector store.
    pub vector_store: ComponentStatus,
    /// Each generation provider, in chain order.
    pub generation: Vec<(String, ComponentStatus)>,
}

impl HealthReport {
    /// Whether every collaborator is reachable.
    pub fn is_healthy(&self) -> bool {
        self.embedder.is_reachable()
            && self.vector_store.is_reachable()
            && self.generation.iter().all(|(_, status)| status.is_reachable())
    }
}

/// The query pipeline orchestrator.
///
/// Cheap to share behind an `Arc`; concurrent requests only contend on the
/// answer cache. Construct one via [`QueryPipeline::builder()`].
pub struct QueryPipeline {
    config: QueryConfig,
    router: ScopeRouter,
    expander: Option<QueryExpander>,
    retriever: Retriever,
    relevance: RelevancePolicy,
    chain: ProviderChain,
    generator: ResponseGenerator,
    cache: Arc<dyn AnswerCache>,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Return a reference to the answer cache.
    pub fn cache(&self) -> &Arc<dyn AnswerCache> {
        &self.cache
    }

    /// Answer a [`QueryRequest`].
    pub async fn ask(&self, request: &QueryRequest) -> Answer {
        self.process_query(&request.question, request.current_document.as_deref()).await
    }

    /// Answer `question`, optionally in the context of the user's active document.
    ///
    /// Never fails. Degraded answers (blank question, every generation provider
    /// down) carry an explanatory message and are not cached.
    pub async fn process_query(&self, question: &str, active_document: Option<&str>) -> Answer {
        let active_document = active_document.map(str::trim).filter(|d| !d.is_empty());
        if question.trim().is_empty() {
            return Answer::unsourced(EMPTY_QUESTION_REPLY);
        }

        let key = CacheKey::new(question, active_document);
        if let Some(answer) = self.cache.get(&key) {
            debug!(%key, "answer cache hit");
            return answer;
        }

        let (answer, cacheable) = self.answer(question, active_document).await;
        if cacheable {
            self.cache.put(key, answer.clone());
        }
        answer
    }

    async fn answer(&self, question: &str, active_document: Option<&str>) -> (Answer, bool) {
        let scope = self.router.decide(question, active_document).await;
        if scope.generic {
            info!("generic question, answering conversationally");
            let reply = self.generator.conversational(question, None).await;
            return (Answer::unsourced(reply.text), !reply.degraded);
        }

        let expansion = match &self.expander {
            Some(expander) => expander.expand(question, active_document).await,
            None => Expansion::single(question),
        };
        if expansion.generic {
            info!("expander marked question as generic, answering conversationally");
            let reply = self.generator.conversational(question, None).await;
            return (Answer::unsourced(reply.text), !reply.degraded);
        }

        let filter = scope.filter();
        let matches =
            self.retriever.retrieve(&expansion.queries, filter.as_ref(), self.config.top_k).await;
        let context = self.relevance.select_context(&matches, &scope);

        if context.is_empty() {
            let missing = if scope.is_scoped() {
                scope.target_document.as_deref()
            } else {
                active_document
            };
            info!(
                scope = ?scope.kind,
                missing_document = ?missing,
                "no relevant context, answering conversationally"
            );
            let reply = self.generator.conversational(question, missing).await;
            return (Answer::unsourced(reply.text), !reply.degraded);
        }

        info!(
            chunk_count = context.chunks.len(),
            sources = ?context.sources,
            "answering from retrieved context"
        );
        let reply = self.generator.grounded(question, &context.chunks).await;
        (Answer { text: reply.text, sources: context.sources }, !reply.degraded)
    }

    /// Delete every indexed vector and drop all cached answers.
    ///
    /// # Errors
    ///
    /// Returns the vector store's error, or [`RagError::Timeout`]. The cache is
    /// left untouched when the store could not be cleared.
    pub async fn clear_index(&self) -> Result<()> {
        let timeout = self.config.request_timeout;
        within(timeout, "delete_all", self.retriever.store().delete_all())
            .await
            .inspect_err(|e| warn!(error = %e, "failed to clear vector store"))?;
        self.cache.clear();
        info!("vector store and answer cache cleared");
        Ok(())
    }

    /// Check every collaborator once.
    pub async fn health(&self) -> HealthReport {
        let timeout = self.config.request_timeout;
        let provider = self.retriever.embedder().provider();

        let embedder = ComponentStatus::from_result(
            within(timeout, "embedding", provider.embed("health check")).await,
        );

        let dimensions = provider.dimensions().max(1);
        let unit_vector = vec![1.0 / (dimensions as f32).sqrt(); dimensions];
        let store = self.retriever.store();
        let vector_store = ComponentStatus::from_result(
            within(timeout, "vector search", store.query(&unit_vector, 1, None)).await,
        );

        let mut generation = Vec::with_capacity(self.chain.providers().len());
        for provider in self.chain.providers() {
            let result = self.chain.call(provider.as_ref(), HEALTH_PROMPT).await;
            generation.push((provider.name().to_string(), ComponentStatus::from_result(result)));
        }

        HealthReport { embedder, vector_store, generation }
    }
}

/// Builder for constructing a [`QueryPipeline`].
///
/// An embedding provider, a vector store and at least one generation provider
/// are required. Generation providers are tried in the order they are added.
/// Without an explicit cache, a [`MokaAnswerCache`] sized from the config is used.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = QueryPipeline::builder()
///     .config(config)
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generation_provider(Arc::new(primary))
///     .cache(Arc::new(MokaAnswerCache::new(256)))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<QueryConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generation_providers: Vec<Arc<dyn GenerationProvider>>,
    cache: Option<Arc<dyn AnswerCache>>,
}

impl QueryPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`QueryConfig::default`].
    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Append a generation provider to the fallback chain.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_providers.push(provider);
        self
    }

    /// Replace the whole generation chain.
    pub fn generation_providers(mut self, providers: Vec<Arc<dyn GenerationProvider>>) -> Self {
        self.generation_providers = providers;
        self
    }

    /// Set the answer cache.
    pub fn cache(mut self, cache: Arc<dyn AnswerCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the [`QueryPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required collaborator is missing.
    pub fn build(self) -> Result<QueryPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        if self.generation_providers.is_empty() {
            return Err(RagError::ConfigError(
                "at least one generation provider is required".to_string(),
            ));
        }

        let chain = ProviderChain::new(self.generation_providers, config.request_timeout);
        let embedder = Embedder::new(embedding_provider, &config);
        let retriever = Retriever::new(embedder, vector_store, config.request_timeout);
        let expander = config
            .expand_queries
            .then(|| QueryExpander::new(chain.clone(), config.max_query_variants));
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(MokaAnswerCache::from_config(&config)) as Arc<dyn AnswerCache>
        });

        Ok(QueryPipeline {
            router: ScopeRouter::new(chain.clone()),
            expander,
            retriever,
            relevance: RelevancePolicy::from_config(&config),
            generator: ResponseGenerator::new(chain.clone()),
            chain,
            cache,
            config,
        })
    }
}
