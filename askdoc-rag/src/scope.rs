//! Scope routing: which documents a question should be answered from.
//!
//! A language model labels each question as targeting the active document,
//! another named document, or the whole corpus. The router never fails: any
//! upstream error or unreadable label falls back to searching everything.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::DocumentFilter;
use crate::generation::ProviderChain;
use crate::structured::extract_json;

/// Which part of the corpus a search is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// The whole corpus.
    All,
    /// The document the user currently has open.
    Current,
    /// A document the user named explicitly.
    Specific,
}

/// The router's verdict for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDecision {
    /// The retrieval scope.
    pub kind: ScopeKind,
    /// The document searched under `Current` or `Specific`.
    pub target_document: Option<String>,
    /// Small talk that needs no retrieval at all.
    pub generic: bool,
}

impl ScopeDecision {
    /// Search the whole corpus.
    pub fn all() -> Self {
        Self { kind: ScopeKind::All, target_document: None, generic: false }
    }

    /// Search only the active document.
    pub fn current(document: impl Into<String>) -> Self {
        Self { kind: ScopeKind::Current, target_document: Some(document.into()), generic: false }
    }

    /// Search only a named document.
    pub fn specific(document: impl Into<String>) -> Self {
        Self { kind: ScopeKind::Specific, target_document: Some(document.into()), generic: false }
    }

    /// Mark the question as small talk.
    pub fn with_generic(mut self, generic: bool) -> Self {
        self.generic = generic;
        self
    }

    /// Whether the search is restricted to a single document.
    pub fn is_scoped(&self) -> bool {
        self.kind != ScopeKind::All && self.target_document.is_some()
    }

    /// The retrieval filter for this scope; `None` means unrestricted.
    pub fn filter(&self) -> Option<DocumentFilter> {
        match self.kind {
            ScopeKind::All => None,
            ScopeKind::Current | ScopeKind::Specific => {
                self.target_document.as_deref().map(DocumentFilter::document)
            }
        }
    }
}

impl Default for ScopeDecision {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Deserialize)]
enum ScopeLabel {
    #[serde(alias = "all", alias = "ALL", alias = "global")]
    All,
    #[serde(alias = "current", alias = "CURRENT", alias = "current_document")]
    Current,
    #[serde(alias = "specific", alias = "SPECIFIC", alias = "other")]
    Specific,
}

/// The object the classifier is asked to return.
#[derive(Debug, Deserialize)]
struct ScopeClassification {
    scope: ScopeLabel,
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    is_generic: bool,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Apply the scope invariants to a parsed classification.
fn resolve(classification: ScopeClassification, active_document: Option<&str>) -> ScopeDecision {
    let decision = match classification.scope {
        ScopeLabel::All => ScopeDecision::all(),
        ScopeLabel::Current => match non_blank(active_document) {
            Some(document) => ScopeDecision::current(document),
            None => {
                debug!("classifier chose the current document but none is active");
                ScopeDecision::all()
            }
        },
        ScopeLabel::Specific => match non_blank(classification.document.as_deref()) {
            Some(document) => ScopeDecision::specific(document),
            None => ScopeDecision::all(),
        },
    };
    decision.with_generic(classification.is_generic)
}

fn classification_prompt(question: &str, active_document: Option<&str>) -> String {
    format!(
        "Classify the retrieval scope of a user question.\n\
         Question: '{question}'\n\
         Active document: {}\n\n\
         Decide which documents should be searched:\n\
         - \"current\": the user refers to the active document (\"this file\", \"this document\")\n\
         - \"specific\": the user names another document; put its file name in \"document\"\n\
         - \"all\": anything else; search every document\n\
         Set \"is_generic\" to true when the message is a greeting or small talk \
         that needs no documents.\n\n\
         Respond ONLY with a JSON object: \
         {{\"scope\": \"current\" | \"specific\" | \"all\", \
         \"document\": string or null, \"is_generic\": true/false}}",
        active_document.unwrap_or("None")
    )
}

/// Classifies questions into a [`ScopeDecision`] using a language model.
#[derive(Clone)]
pub struct ScopeRouter {
    chain: ProviderChain,
}

impl ScopeRouter {
    /// Create a router that classifies through `chain`.
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    /// Decide the retrieval scope for `question`.
    ///
    /// Falls back to [`ScopeDecision::all`] on any failure.
    pub async fn decide(&self, question: &str, active_document: Option<&str>) -> ScopeDecision {
        let prompt = classification_prompt(question, active_document);
        let raw = match self.chain.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "scope classification unavailable, searching all documents");
                return ScopeDecision::all();
            }
        };

        match extract_json::<ScopeClassification>(&raw) {
            Ok(classification) => {
                let decision = resolve(classification, active_document);
                debug!(
                    scope = ?decision.kind,
                    target = ?decision.target_document,
                    generic = decision.generic,
                    "scope decided"
                );
                decision
            }
            Err(e) => {
                warn!(error = %e, "malformed scope classification, searching all documents");
                ScopeDecision::all()
            }
        }
    }
}
