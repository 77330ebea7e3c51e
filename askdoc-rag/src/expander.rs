//! Multi-query expansion.
//!
//! Vague questions often miss the wording used in the documents. The expander
//! asks a language model for a few short, entity-focused rewrites and searches
//! with all of them. On any failure the original question is searched alone.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::generation::ProviderChain;
use crate::structured::extract_json;

/// The expander's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Small talk that needs no retrieval.
    pub generic: bool,
    /// Queries to search with; never empty, the original question first.
    pub queries: Vec<String>,
}

impl Expansion {
    /// Search with the question alone.
    pub fn single(question: &str) -> Self {
        Self { generic: false, queries: vec![question.to_string()] }
    }
}

#[derive(Debug, Deserialize)]
struct ExpansionResponse {
    #[serde(default)]
    is_generic: bool,
    queries: Vec<String>,
}

fn expansion_prompt(question: &str, active_document: Option<&str>, variants: usize) -> String {
    format!(
        "Rewrite the user's question into search queries.\n\
         Question: '{question}'\n\
         Active document: {}\n\n\
         1. Is this a greeting or small talk that needs no documents? Set \"is_generic\".\n\
         2. If not, write {variants} different short search variations of the question, \
         focused on its key entities, to improve retrieval coverage.\n\n\
         Respond ONLY with a JSON object: \
         {{\"is_generic\": true/false, \"queries\": [\"string1\", \"string2\", \"string3\"]}}",
        active_document.unwrap_or("None")
    )
}

/// Rewrites a question into several retrieval queries.
#[derive(Clone)]
pub struct QueryExpander {
    chain: ProviderChain,
    max_variants: usize,
}

impl QueryExpander {
    /// Create an expander keeping at most `max_variants` rewrites.
    pub fn new(chain: ProviderChain, max_variants: usize) -> Self {
        Self { chain, max_variants }
    }

    /// Expand `question` into retrieval queries.
    ///
    /// Falls back to [`Expansion::single`] on any failure.
    pub async fn expand(&self, question: &str, active_document: Option<&str>) -> Expansion {
        let prompt = expansion_prompt(question, active_document, self.max_variants);
        let raw = match self.chain.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "query expansion unavailable, using the original question");
                return Expansion::single(question);
            }
        };

        match extract_json::<ExpansionResponse>(&raw) {
            Ok(response) => {
                let expansion = Expansion {
                    generic: response.is_generic,
                    queries: self.collect_queries(question, response.queries),
                };
                debug!(queries = ?expansion.queries, generic = expansion.generic, "expanded query");
                expansion
            }
            Err(e) => {
                warn!(error = %e, "malformed query expansion, using the original question");
                Expansion::single(question)
            }
        }
    }

    /// Original question first, then unique non-blank variants.
    fn collect_queries(&self, question: &str, variants: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        seen.insert(question.trim().to_lowercase());
        let mut queries = vec![question.to_string()];
        for variant in variants {
            if queries.len() > self.max_variants {
                break;
            }
            let variant = variant.trim();
            if variant.is_empty() || !seen.insert(variant.to_lowercase()) {
                continue;
            }
            queries.push(variant.to_string());
        }
        queries
    }
}
