//! Multi-query retrieval orchestration.
//!
//! Each query variant is embedded and searched on its own; failures only drop
//! that variant's contribution. Results are merged so that the first copy of
//! every id wins and the merged list is ordered by score.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::document::{DocumentFilter, Match};
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::vectorstore::VectorStore;

/// Merge per-variant result lists.
///
/// Deduplicates by `id`, keeping the first-seen copy in variant order, then
/// stable-sorts by descending score so equal scores keep their first-seen order.
pub fn merge_matches(batches: impl IntoIterator<Item = Vec<Match>>) -> Vec<Match> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Match> = batches
        .into_iter()
        .flatten()
        .filter(|m| seen.insert(m.id.clone()))
        .collect();
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged
}

/// Embeds query variants and searches the vector store for each one.
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever; `timeout` bounds each vector store query.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, timeout: Duration) -> Self {
        Self { embedder, store, timeout }
    }

    /// Return a reference to the embedder.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Return a reference to the vector store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Search once per variant, sequentially, and merge the results.
    pub async fn retrieve(
        &self,
        variants: &[String],
        filter: Option<&DocumentFilter>,
        top_k: usize,
    ) -> Vec<Match> {
        let mut batches = Vec::with_capacity(variants.len());
        for variant in variants {
            let embedding = self.embedder.embed(variant).await;
            if embedding.is_empty() {
                warn!(query = %variant, "no embedding for query variant, skipping");
                continue;
            }

            match self.search(&embedding, top_k, filter).await {
                Ok(matches) => {
                    debug!(query = %variant, match_count = matches.len(), "variant searched");
                    batches.push(matches);
                }
                Err(e) => warn!(query = %variant, error = %e, "search failed for query variant"),
            }
        }

        let merged = merge_matches(batches);
        info!(
            variants = variants.len(),
            match_count = merged.len(),
            filtered = filter.is_some(),
            "retrieval completed"
        );
        merged
    }

    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&DocumentFilter>,
    ) -> crate::error::Result<Vec<Match>> {
        tokio::time::timeout(self.timeout, self.store.query(embedding, top_k, filter))
            .await
            .map_err(|_| RagError::Timeout {
                operation: "vector search".into(),
                after: self.timeout,
            })?
    }
}
