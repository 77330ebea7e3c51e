//! Configuration for the query pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Number of nearest neighbours requested per query variant.
    pub top_k: usize,
    /// Minimum score (exclusive) for unrestricted, corpus-wide searches.
    pub global_threshold: f32,
    /// Minimum score (exclusive) for searches scoped to one document.
    pub scoped_threshold: f32,
    /// Maximum number of context chunks placed into a grounded prompt.
    pub max_context_chunks: usize,
    /// Whether to rewrite each question into several retrieval variants.
    pub expand_queries: bool,
    /// Maximum number of model-written variants kept in addition to the question.
    pub max_query_variants: usize,
    /// Total embedding attempts, including the first one.
    pub embed_attempts: u32,
    /// Pause between embedding attempts.
    pub embed_retry_delay: Duration,
    /// Deadline applied to every remote call.
    pub request_timeout: Duration,
    /// Maximum number of cached answers.
    pub cache_capacity: u64,
    /// Optional time-to-live for cached answers.
    pub cache_ttl: Option<Duration>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            global_threshold: 0.30,
            scoped_threshold: 0.25,
            max_context_chunks: 10,
            expand_queries: false,
            max_query_variants: 3,
            embed_attempts: 3,
            embed_retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            cache_capacity: 1024,
            cache_ttl: None,
        }
    }
}

impl QueryConfig {
    /// Create a new builder for constructing a [`QueryConfig`].
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`QueryConfig`].
#[derive(Debug, Clone, Default)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    /// Set the number of nearest neighbours requested per query variant.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the threshold used for unrestricted searches.
    pub fn global_threshold(mut self, threshold: f32) -> Self {
        self.config.global_threshold = threshold;
        self
    }

    /// Set the threshold used for document-scoped searches.
    pub fn scoped_threshold(mut self, threshold: f32) -> Self {
        self.config.scoped_threshold = threshold;
        self
    }

    /// Set the maximum number of context chunks in a grounded prompt.
    pub fn max_context_chunks(mut self, max: usize) -> Self {
        self.config.max_context_chunks = max;
        self
    }

    /// Enable or disable multi-query expansion.
    pub fn expand_queries(mut self, enabled: bool) -> Self {
        self.config.expand_queries = enabled;
        self
    }

    /// Set how many model-written variants are kept.
    pub fn max_query_variants(mut self, max: usize) -> Self {
        self.config.max_query_variants = max;
        self
    }

    /// Set the total number of embedding attempts.
    pub fn embed_attempts(mut self, attempts: u32) -> Self {
        self.config.embed_attempts = attempts;
        self
    }

    /// Set the pause between embedding attempts.
    pub fn embed_retry_delay(mut self, delay: Duration) -> Self {
        self.config.embed_retry_delay = delay;
        self
    }

    /// Set the deadline applied to every remote call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the maximum number of cached answers.
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set a time-to-live for cached answers.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = Some(ttl);
        self
    }

    /// Build the [`QueryConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k`, `max_context_chunks`, `embed_attempts` or `cache_capacity` is zero
    /// - a threshold lies outside `[-1, 1]`
    /// - `scoped_threshold > global_threshold`
    /// - `request_timeout` is zero
    pub fn build(self) -> Result<QueryConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.max_context_chunks == 0 {
            return Err(RagError::ConfigError(
                "max_context_chunks must be greater than zero".to_string(),
            ));
        }
        if config.embed_attempts == 0 {
            return Err(RagError::ConfigError(
                "embed_attempts must be greater than zero".to_string(),
            ));
        }
        if config.cache_capacity == 0 {
            return Err(RagError::ConfigError(
                "cache_capacity must be greater than zero".to_string(),
            ));
        }
        let thresholds = [
            ("global_threshold", config.global_threshold),
            ("scoped_threshold", config.scoped_threshold),
        ];
        for (name, value) in thresholds {
            if !(-1.0..=1.0).contains(&value) {
                return Err(RagError::ConfigError(format!(
                    "{name} ({value}) must lie within [-1, 1]"
                )));
            }
        }
        if config.scoped_threshold > config.global_threshold {
            return Err(RagError::ConfigError(format!(
                "scoped_threshold ({}) must not exceed global_threshold ({})",
                config.scoped_threshold, config.global_threshold
            )));
        }
        if config.request_timeout.is_zero() {
            return Err(RagError::ConfigError("request_timeout must be non-zero".to_string()));
        }
        Ok(config)
    }
}
