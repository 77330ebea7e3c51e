//! Deterministic providers for tests and offline demos.
//!
//! [`MockEmbeddingProvider`] derives vectors from a text hash unless a fixed
//! vector was registered for the exact text. [`MockGenerationProvider`]
//! answers with canned replies selected by prompt substrings and records every
//! prompt it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// Hash-based embeddings with optional fixed vectors per text.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fixed: HashMap<String, Vec<f32>>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Create a provider producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, fixed: HashMap::new(), unavailable: false, calls: AtomicUsize::new(0) }
    }

    /// A provider whose every call fails with a transient error.
    pub fn unavailable(dimensions: usize) -> Self {
        Self { unavailable: true, ..Self::new(dimensions) }
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    /// Number of `embed` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut embedding = vec![0.0f32; self.dimensions];
        for (i, v) in embedding.iter_mut().enumerate() {
            *v = (hash.wrapping_add(i as u64) as f32).sin();
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RagError::EmbeddingError {
                provider: "Mock".into(),
                message: "service unavailable".into(),
                transient: true,
            });
        }
        Ok(self.fixed.get(text).cloned().unwrap_or_else(|| self.hashed(text)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Canned-reply generation provider.
///
/// Rules are checked in insertion order; the first whose needle occurs in the
/// prompt wins. Without a matching rule the default reply is returned.
#[derive(Debug)]
pub struct MockGenerationProvider {
    name: String,
    rules: Vec<(String, String)>,
    default_reply: String,
    failing: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerationProvider {
    /// Create a provider that answers every prompt with a generic reply.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            default_reply: "This is a mock answer.".to_string(),
            failing: false,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider whose every call fails.
    pub fn failing(name: impl Into<String>) -> Self {
        Self { failing: true, ..Self::new(name) }
    }

    /// Reply with `reply` to prompts containing `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), reply.into()));
        self
    }

    /// Reply used when no rule matches.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());

        if self.failing {
            return Err(RagError::GenerationError {
                provider: self.name.clone(),
                message: "mock provider configured to fail".into(),
            });
        }

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone());
        Ok(reply)
    }
}
