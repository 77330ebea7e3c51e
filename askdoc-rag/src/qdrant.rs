//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use askdoc_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", "documents", 384)?;
//! store.upsert(&records).await?;
//! let matches = store.query(&query_embedding, 5, None).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::debug;

use crate::document::{DocumentFilter, IndexRecord, Match};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// A [`VectorStore`] backed by a single [Qdrant](https://qdrant.tech/) collection.
///
/// The collection uses cosine distance and is created on first use, including
/// the first query, so searching a fresh deployment yields no matches. Record
/// ids must be UUIDs or unsigned integers, as Qdrant requires. Metadata is
/// stored as flat payload fields (`document_name`, `chunk_text`,
/// `chunk_index`, `file_url`) so `document_name` can be filtered on.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimensions: usize,
    ready: AtomicBool,
}

impl QdrantVectorStore {
    /// Connect to the Qdrant instance at `url`.
    pub fn new(url: &str, collection: impl Into<String>, dimensions: usize) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self::from_client(client, collection, dimensions))
    }

    /// Create a store from an existing client.
    pub fn from_client(client: Qdrant, collection: impl Into<String>, dimensions: usize) -> Self {
        Self { client, collection: collection.into(), dimensions, ready: AtomicBool::new(false) }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// Create the collection unless it already exists.
    async fn ensure_collection(&self) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }
        let exists =
            self.client.collection_exists(&self.collection).await.map_err(Self::map_err)?;
        if exists {
            self.ready.store(true, Ordering::Release);
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimensions as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(
            collection = %self.collection,
            dimensions = self.dimensions,
            "created qdrant collection"
        );
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn extract_index(value: &QdrantValue) -> Option<u32> {
        match &value.kind {
            Some(Kind::IntegerValue(i)) => u32::try_from(*i).ok(),
            Some(Kind::DoubleValue(d)) if *d >= 0.0 => Some(*d as u32),
            _ => None,
        }
    }

    fn to_match(point: ScoredPoint) -> Match {
        let id = point
            .id
            .as_ref()
            .and_then(|pid| match &pid.point_id_options {
                Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                None => None,
            })
            .unwrap_or_default();
        let text = |field: &str| point.payload.get(field).and_then(Self::extract_string);

        Match {
            id,
            score: point.score,
            document_name: text("document_name").unwrap_or_else(|| "Unknown".to_string()),
            chunk_text: text("chunk_text").or_else(|| text("text")).unwrap_or_default(),
            chunk_index: point
                .payload
                .get("chunk_index")
                .and_then(Self::extract_index)
                .unwrap_or(0),
            file_url: text("file_url"),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.ensure_collection().await?;

        let points = records
            .iter()
            .map(|record| {
                let mut payload = json!({
                    "document_name": record.metadata.document_name,
                    "chunk_text": record.metadata.chunk_text,
                    "chunk_index": record.metadata.chunk_index,
                });
                if let Some(url) = &record.metadata.file_url {
                    payload["file_url"] = json!(url);
                }
                let payload = Payload::try_from(payload).map_err(Self::map_err)?;
                Ok(PointStruct::new(record.id.clone(), record.embedding.clone(), payload))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection, count = records.len(), "upserted records to qdrant");
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Match>> {
        self.ensure_collection().await?;

        let mut request =
            SearchPointsBuilder::new(&self.collection, embedding.to_vec(), top_k as u64)
                .with_payload(true);
        if let Some(filter) = filter {
            request = request.filter(Filter::must([Condition::matches(
                "document_name",
                filter.document_name.clone(),
            )]));
        }

        let response = self.client.search_points(request).await.map_err(Self::map_err)?;
        Ok(response.result.into_iter().map(Self::to_match).collect())
    }

    async fn delete_all(&self) -> Result<()> {
        self.ready.store(false, Ordering::Release);
        self.client.delete_collection(&self.collection).await.map_err(Self::map_err)?;
        debug!(collection = %self.collection, "deleted qdrant collection");
        self.ensure_collection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL_QDRANT: &str = "http://localhost:6334";

    fn scored(payload: serde_json::Value) -> ScoredPoint {
        ScoredPoint {
            id: Some(7u64.into()),
            payload: Payload::try_from(payload).unwrap().into(),
            score: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn payload_fields_map_onto_match() {
        let point = scored(json!({
            "document_name": "invoice.pdf",
            "chunk_text": "Invoice #42",
            "chunk_index": 3,
            "file_url": "https://files.example/invoice.pdf",
        }));
        let m = QdrantVectorStore::to_match(point);
        assert_eq!(m.id, "7");
        assert_eq!(m.document_name, "invoice.pdf");
        assert_eq!(m.chunk_text, "Invoice #42");
        assert_eq!(m.chunk_index, 3);
        assert_eq!(m.file_url.as_deref(), Some("https://files.example/invoice.pdf"));
    }

    #[test]
    fn missing_payload_fields_fall_back() {
        let m = QdrantVectorStore::to_match(scored(json!({ "text": "legacy chunk" })));
        assert_eq!(m.document_name, "Unknown");
        assert_eq!(m.chunk_text, "legacy chunk");
        assert_eq!(m.chunk_index, 0);
        assert_eq!(m.file_url, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Qdrant instance on localhost:6334"]
    async fn query_on_fresh_collection_is_empty() {
        let collection = format!("askdoc-fresh-{}", std::process::id());
        let store = QdrantVectorStore::new(LOCAL_QDRANT, &collection, 4).unwrap();

        let matches = store.query(&[0.5, 0.5, 0.5, 0.5], 5, None).await.unwrap();
        assert!(matches.is_empty());

        store.client.delete_collection(&collection).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Qdrant instance on localhost:6334"]
    async fn delete_all_leaves_an_empty_searchable_collection() {
        let collection = format!("askdoc-clear-{}", std::process::id());
        let store = QdrantVectorStore::new(LOCAL_QDRANT, &collection, 4).unwrap();
        store.delete_all().await.unwrap();

        let matches = store.query(&[0.5, 0.5, 0.5, 0.5], 5, None).await.unwrap();
        assert!(matches.is_empty());

        store.client.delete_collection(&collection).await.unwrap();
    }
}
