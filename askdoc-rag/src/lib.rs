//! # askdoc-rag
//!
//! Retrieval-grounded question answering over an indexed document corpus.
//!
//! ## Overview
//!
//! [`QueryPipeline`] takes a question (and optionally the document the user
//! has open), decides which documents to search, retrieves matching chunks,
//! and answers from them. When nothing relevant is found it falls back to a
//! conversational answer. Collaborators sit behind traits:
//!
//! - [`EmbeddingProvider`] - text to vector (Hugging Face, mock)
//! - [`VectorStore`] - nearest-neighbour search (in-memory, Qdrant)
//! - [`GenerationProvider`] - prompt to text (OpenAI-compatible chat, mock)
//! - [`AnswerCache`] - finished answers (bounded moka cache)
//!
//! ## Features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `huggingface` (default) | [`huggingface::HuggingFaceEmbeddingProvider`], HF router chat |
//! | `openai` (default) | [`chat::ChatCompletionsProvider::openai`] |
//! | `qdrant` | `qdrant::QdrantVectorStore` |

pub mod cache;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod expander;
pub mod generation;
pub mod inmemory;
pub mod mock;
pub mod pipeline;
pub mod relevance;
pub mod retrieval;
pub mod scope;
pub mod structured;
pub mod vectorstore;

#[cfg(any(feature = "huggingface", feature = "openai"))]
pub mod chat;
#[cfg(feature = "huggingface")]
pub mod huggingface;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use cache::{AnswerCache, CacheKey, MokaAnswerCache};
pub use config::{QueryConfig, QueryConfigBuilder};
pub use document::{Answer, ChunkMetadata, DocumentFilter, IndexRecord, Match, QueryRequest};
pub use embedding::{Embedder, EmbeddingPayload, EmbeddingProvider};
pub use error::{RagError, Result};
pub use expander::{Expansion, QueryExpander};
pub use generation::{GenerationProvider, ProviderChain, Reply, ResponseGenerator};
pub use inmemory::InMemoryVectorStore;
pub use mock::{MockEmbeddingProvider, MockGenerationProvider};
pub use pipeline::{ComponentStatus, HealthReport, QueryPipeline, QueryPipelineBuilder};
pub use relevance::{RelevancePolicy, SelectedContext};
pub use retrieval::{Retriever, merge_matches};
pub use scope::{ScopeDecision, ScopeKind, ScopeRouter};
pub use structured::{MalformedOutput, extract_json};
pub use vectorstore::VectorStore;
