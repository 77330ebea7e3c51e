//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{DocumentFilter, IndexRecord, Match};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// The query pipeline only reads from the store; `upsert` and `delete_all`
/// exist for the ingestion side and for resetting the corpus.
///
/// # Example
///
/// ```rust,ignore
/// use askdoc_rag::{DocumentFilter, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&records).await?;
/// let filter = DocumentFilter::document("report.pdf");
/// let matches = store.query(&query_embedding, 5, Some(&filter)).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by id.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;

    /// Return the `top_k` records most similar to `embedding`.
    ///
    /// When `filter` is set, only records from that document are considered.
    /// Results are ordered by descending similarity score.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Match>>;

    /// Remove every stored record.
    async fn delete_all(&self) -> Result<()>;
}
