//! Relevance filtering and answer-mode selection.

use std::collections::HashSet;

use tracing::debug;

use crate::config::QueryConfig;
use crate::document::Match;
use crate::scope::ScopeDecision;

/// Context chosen for a grounded answer.
///
/// Empty `chunks` means the pipeline should answer conversationally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedContext {
    /// Chunk texts in rank order.
    pub chunks: Vec<String>,
    /// Unique document names in rank order of first appearance.
    pub sources: Vec<String>,
}

impl SelectedContext {
    /// Whether no evidence passed the threshold.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Scope-dependent similarity thresholds.
///
/// Document-scoped searches use `scoped_threshold`, corpus-wide searches use
/// `global_threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevancePolicy {
    global_threshold: f32,
    scoped_threshold: f32,
    max_chunks: usize,
}

impl RelevancePolicy {
    /// Create a policy from explicit thresholds.
    pub fn new(global_threshold: f32, scoped_threshold: f32, max_chunks: usize) -> Self {
        Self { global_threshold, scoped_threshold, max_chunks }
    }

    /// Create a policy from pipeline configuration.
    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(config.global_threshold, config.scoped_threshold, config.max_context_chunks)
    }

    /// The threshold a match must exceed under `scope`.
    pub fn threshold_for(&self, scope: &ScopeDecision) -> f32 {
        if scope.is_scoped() { self.scoped_threshold } else { self.global_threshold }
    }

    /// Keep matches scoring strictly above the scope's threshold.
    ///
    /// `matches` must already be sorted by descending score.
    pub fn select_context(&self, matches: &[Match], scope: &ScopeDecision) -> SelectedContext {
        let threshold = self.threshold_for(scope);
        let mut selected = SelectedContext::default();
        let mut seen_sources = HashSet::new();

        for m in matches.iter().filter(|m| m.score > threshold).take(self.max_chunks) {
            selected.chunks.push(m.chunk_text.clone());
            if seen_sources.insert(m.document_name.as_str()) {
                selected.sources.push(m.document_name.clone());
            }
        }

        debug!(
            threshold,
            candidates = matches.len(),
            selected = selected.chunks.len(),
            "relevance filter applied"
        );
        selected
    }
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}
