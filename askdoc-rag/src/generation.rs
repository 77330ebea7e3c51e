//! Answer generation: provider trait, ordered provider chain, and prompts.
//!
//! [`ResponseGenerator`] chooses between two prompt shapes:
//!
//! - **grounded**: the model must answer from retrieved context only
//! - **conversational**: the model answers from general knowledge, and is told
//!   when a targeted document had nothing relevant
//!
//! Prompts are sent through a [`ProviderChain`], which tries each configured
//! [`GenerationProvider`] in order until one succeeds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::error::{RagError, Result};

/// A text generation backend: prompt in, completion out.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// An ordered list of generation providers tried in sequence.
///
/// The first provider is the primary; the rest are fallbacks. Every call is
/// bounded by the chain's timeout.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn GenerationProvider>>,
    timeout: Duration,
}

impl ProviderChain {
    /// Create a chain from providers in priority order.
    pub fn new(providers: Vec<Arc<dyn GenerationProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// The providers in priority order.
    pub fn providers(&self) -> &[Arc<dyn GenerationProvider>] {
        &self.providers
    }

    /// The per-call deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call a single provider with the chain's deadline.
    ///
    /// A blank completion counts as a failure.
    pub async fn call(&self, provider: &dyn GenerationProvider, prompt: &str) -> Result<String> {
        let text = tokio::time::timeout(self.timeout, provider.generate(prompt))
            .await
            .map_err(|_| RagError::Timeout {
                operation: format!("generation ({})", provider.name()),
                after: self.timeout,
            })??;
        if text.trim().is_empty() {
            return Err(RagError::GenerationError {
                provider: provider.name().to_string(),
                message: "empty completion".into(),
            });
        }
        Ok(text)
    }

    /// Generate with the first provider that succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] listing every provider's failure
    /// when none succeeds, or when the chain is empty.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match self.call(provider.as_ref(), prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "generation provider failed");
                    failures.push(format!("{}: {e}", provider.name()));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no generation providers configured".to_string());
        }
        Err(RagError::GenerationError { provider: "chain".into(), message: failures.join("; ") })
    }
}

/// Build the grounded-mode prompt from ranked context chunks.
pub fn grounded_prompt(question: &str, chunks: &[String]) -> String {
    format!(
        "Context provided:\n{}\n\n\
         User Question: {question}\n\n\
         Answer strictly based on the context above. If the context does not contain \
         the answer, state clearly that the documents do not contain it instead of guessing.",
        chunks.join("\n\n")
    )
}

/// Build the conversational-mode prompt.
///
/// `missing_document` names a document that was searched but had nothing
/// relevant; the model is asked to tell the user so.
pub fn conversational_prompt(question: &str, missing_document: Option<&str>) -> String {
    match missing_document {
        Some(document) => format!(
            "The user is asking about the document '{document}', but it contains no \
             information relevant to this question.\n\
             First tell the user that '{document}' does not contain relevant information, \
             then answer helpfully from your general knowledge.\n\n\
             User Question: {question}"
        ),
        None => format!(
            "Answer the user's question helpfully from your general knowledge.\n\n\
             User Question: {question}"
        ),
    }
}

/// A generated reply, flagged when it is an error message rather than an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The answer text, or a human-readable error description.
    pub text: String,
    /// `true` when every provider failed.
    pub degraded: bool,
}

/// Produces answers in grounded or conversational mode.
#[derive(Clone)]
pub struct ResponseGenerator {
    chain: ProviderChain,
}

impl ResponseGenerator {
    /// Create a generator backed by `chain`.
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    /// Answer strictly from the supplied context chunks.
    pub async fn grounded(&self, question: &str, chunks: &[String]) -> Reply {
        self.reply(&grounded_prompt(question, chunks)).await
    }

    /// Answer from general knowledge.
    pub async fn conversational(&self, question: &str, missing_document: Option<&str>) -> Reply {
        self.reply(&conversational_prompt(question, missing_document)).await
    }

    async fn reply(&self, prompt: &str) -> Reply {
        match self.chain.generate(prompt).await {
            Ok(text) => Reply { text, degraded: false },
            Err(e) => {
                error!(error = %e, "all generation providers failed");
                Reply {
                    text: format!("Sorry, I could not generate an answer right now. {e}"),
                    degraded: true,
                }
            }
        }
    }
}
