//! Data types for queries, indexed chunks, matches, and answers.

use serde::{Deserialize, Serialize};

/// A question submitted to the pipeline.
///
/// `current_document` names the file the user is looking at, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    /// The natural-language question.
    pub question: String,
    /// The document the user currently has open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_document: Option<String>,
}

impl QueryRequest {
    /// Create a request with no active document.
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), current_document: None }
    }

    /// Attach the document the user currently has open.
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.current_document = Some(document.into());
        self
    }
}

/// The pipeline's reply: answer text plus the documents it was grounded in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Answer {
    /// The generated answer, or an explanatory message on failure.
    #[serde(rename = "answer")]
    pub text: String,
    /// Unique document names, in rank order of first appearance.
    pub sources: Vec<String>,
}

impl Answer {
    /// An answer with no supporting documents.
    pub fn unsourced(text: impl Into<String>) -> Self {
        Self { text: text.into(), sources: Vec::new() }
    }
}

/// Metadata stored alongside every indexed vector.
///
/// Upstream preprocessing always fills `document_name` and `chunk_text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Name of the source document (e.g. `invoice.pdf`).
    pub document_name: String,
    /// The chunk's text.
    pub chunk_text: String,
    /// Position of the chunk within its document.
    pub chunk_index: u32,
    /// Link to the original file, when storage provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

/// A vector and its metadata, as written by [`VectorStore::upsert`](crate::VectorStore::upsert).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    /// Unique identifier of the stored vector.
    pub id: String,
    /// The chunk embedding.
    pub embedding: Vec<f32>,
    /// Chunk metadata.
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbour hit returned by a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    /// Identifier of the stored vector.
    pub id: String,
    /// Similarity score (higher is more relevant).
    pub score: f32,
    /// Name of the document the chunk came from.
    pub document_name: String,
    /// The chunk's text.
    pub chunk_text: String,
    /// Position of the chunk within its document.
    pub chunk_index: u32,
    /// Link to the original file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl Match {
    /// Build a match from a stored record and its score.
    pub fn from_record(record: &IndexRecord, score: f32) -> Self {
        Self {
            id: record.id.clone(),
            score,
            document_name: record.metadata.document_name.clone(),
            chunk_text: record.metadata.chunk_text.clone(),
            chunk_index: record.metadata.chunk_index,
            file_url: record.metadata.file_url.clone(),
        }
    }
}

/// Equality filter on the `document_name` metadata field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFilter {
    /// Only vectors whose `document_name` equals this value match.
    pub document_name: String,
}

impl DocumentFilter {
    /// Create a filter selecting a single document.
    pub fn document(name: impl Into<String>) -> Self {
        Self { document_name: name.into() }
    }

    /// Whether the given metadata passes this filter.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        metadata.document_name == self.document_name
    }
}
