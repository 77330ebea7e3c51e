//! End-to-end scenarios for [`QueryPipeline`] against mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use askdoc_rag::{
    AnswerCache, CacheKey, ChunkMetadata, ComponentStatus, InMemoryVectorStore, IndexRecord,
    MockEmbeddingProvider, MockGenerationProvider, MokaAnswerCache, QueryConfig, QueryPipeline,
    QueryRequest, VectorStore,
};

const CLASSIFY: &str = "Classify the retrieval scope";
const EXPAND: &str = "Rewrite the user's question";
const GROUNDED: &str = "Context provided:";

fn record(id: &str, document: &str, text: &str, embedding: Vec<f32>) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        embedding,
        metadata: ChunkMetadata {
            document_name: document.to_string(),
            chunk_text: text.to_string(),
            chunk_index: 0,
            file_url: None,
        },
    }
}

async fn seeded_store() -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    store
        .upsert(&[
            record("inv-0", "invoice.pdf", "Invoice number: INV-2024-001", vec![1.0, 0.0, 0.0]),
            record("rep-0", "report.pdf", "Quarterly revenue grew by 4%.", vec![0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();
    store
}

fn embedder() -> Arc<MockEmbeddingProvider> {
    Arc::new(
        MockEmbeddingProvider::new(3)
            .with_vector("What is the invoice number?", vec![1.0, 0.0, 0.0])
            .with_vector("invoice id", vec![1.0, 0.0, 0.0])
            .with_vector("Summarize this file", vec![0.0, 0.0, 1.0])
            .with_vector("Who wrote the report?", vec![0.0, 0.0, 1.0]),
    )
}

fn llm(classification: &str) -> Arc<MockGenerationProvider> {
    Arc::new(
        MockGenerationProvider::new("primary")
            .with_rule(CLASSIFY, classification)
            .with_rule(GROUNDED, "The invoice number is INV-2024-001.")
            .with_default_reply("Happy to help!"),
    )
}

fn pipeline(
    config: QueryConfig,
    embedder: Arc<MockEmbeddingProvider>,
    store: Arc<InMemoryVectorStore>,
    providers: Vec<Arc<MockGenerationProvider>>,
) -> QueryPipeline {
    let mut builder =
        QueryPipeline::builder().config(config).embedding_provider(embedder).vector_store(store);
    for provider in providers {
        builder = builder.generation_provider(provider);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn grounded_answer_cites_matching_document() {
    let llm = llm(r#"{"scope": "all", "document": null, "is_generic": false}"#);
    let store = seeded_store().await;
    let pipeline = pipeline(QueryConfig::default(), embedder(), store, vec![llm.clone()]);

    let answer = pipeline.process_query("What is the invoice number?", None).await;

    assert_eq!(answer.text, "The invoice number is INV-2024-001.");
    assert_eq!(answer.sources, vec!["invoice.pdf".to_string()]);

    let prompts = llm.prompts().await;
    let grounded = prompts.iter().find(|p| p.starts_with(GROUNDED)).expect("grounded prompt sent");
    assert!(grounded.contains("Invoice number: INV-2024-001"));
    assert!(grounded.contains("User Question: What is the invoice number?"));
    assert!(!grounded.contains("Quarterly revenue"));
}

#[tokio::test]
async fn generic_question_skips_retrieval() {
    let embedder = embedder();
    let llm = llm(r#"{"scope": "all", "document": null, "is_generic": true}"#);
    let store = seeded_store().await;
    let pipeline = pipeline(QueryConfig::default(), embedder.clone(), store, vec![llm]);

    let answer = pipeline.process_query("Hi, how are you?", None).await;

    assert_eq!(answer.text, "Happy to help!");
    assert!(answer.sources.is_empty());
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn scoped_miss_names_the_active_document() {
    let llm = llm(r#"{"scope": "current", "document": null, "is_generic": false}"#);
    let store = seeded_store().await;
    let pipeline = pipeline(QueryConfig::default(), embedder(), store, vec![llm.clone()]);

    let answer = pipeline.process_query("Summarize this file", Some("report.pdf")).await;

    assert!(!answer.text.is_empty());
    assert!(answer.sources.is_empty());
    let prompts = llm.prompts().await;
    let last = prompts.last().unwrap();
    assert!(last.contains("'report.pdf' does not contain relevant information"));
    assert!(last.contains("User Question: Summarize this file"));
}

#[tokio::test]
async fn unscoped_miss_still_names_the_open_document() {
    let llm = llm(r#"{"scope": "all"}"#);
    let pipeline = pipeline(
        QueryConfig::default(),
        embedder(),
        Arc::new(InMemoryVectorStore::new()),
        vec![llm.clone()],
    );

    let answer = pipeline.process_query("Summarize this file", Some("report.pdf")).await;

    assert!(answer.sources.is_empty());
    let prompts = llm.prompts().await;
    let last = prompts.last().unwrap();
    assert!(last.contains("'report.pdf' does not contain relevant information"));
}

#[tokio::test]
async fn malformed_classification_miss_names_the_open_document() {
    let llm = llm("not json at all");
    let pipeline = pipeline(
        QueryConfig::default(),
        embedder(),
        Arc::new(InMemoryVectorStore::new()),
        vec![llm.clone()],
    );

    pipeline.process_query("Summarize this file", Some("report.pdf")).await;

    let prompts = llm.prompts().await;
    assert!(prompts.last().unwrap().contains("report.pdf"));
}

#[tokio::test]
async fn unscoped_miss_without_open_document_names_nothing() {
    let llm = llm(r#"{"scope": "all"}"#);
    let pipeline = pipeline(
        QueryConfig::default(),
        embedder(),
        Arc::new(InMemoryVectorStore::new()),
        vec![llm.clone()],
    );

    pipeline.process_query("Summarize this file", None).await;

    let prompts = llm.prompts().await;
    assert!(!prompts.last().unwrap().contains("does not contain relevant information"));
}

#[tokio::test]
async fn scoped_search_uses_lower_threshold() {
    // cos = 0.27: above the scoped threshold, below the global one.
    let question = vec![0.27, (1.0f32 - 0.27 * 0.27).sqrt(), 0.0];
    let store = Arc::new(InMemoryVectorStore::new());
    let chunk = record("rep-0", "report.pdf", "Revenue grew.", vec![1.0, 0.0, 0.0]);
    store.upsert(&[chunk]).await.unwrap();
    let embedder =
        Arc::new(MockEmbeddingProvider::new(3).with_vector("How did revenue change?", question));

    let scoped = pipeline(
        QueryConfig::default(),
        embedder.clone(),
        store.clone(),
        vec![llm(r#"{"scope": "current", "document": null, "is_generic": false}"#)],
    );
    let answer = scoped.process_query("How did revenue change?", Some("report.pdf")).await;
    assert_eq!(answer.sources, vec!["report.pdf".to_string()]);

    let global = pipeline(
        QueryConfig::default(),
        embedder,
        store,
        vec![llm(r#"{"scope": "all", "document": null, "is_generic": false}"#)],
    );
    let answer = global.process_query("How did revenue change?", None).await;
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn specific_scope_filters_to_named_document() {
    let llm = llm(r#"{"scope": "specific", "document": "report.pdf", "is_generic": false}"#);
    let store = seeded_store().await;
    let pipeline = pipeline(QueryConfig::default(), embedder(), store, vec![llm.clone()]);

    // The question vector matches invoice.pdf, which the filter excludes.
    let answer = pipeline.process_query("What is the invoice number?", Some("invoice.pdf")).await;

    assert!(answer.sources.is_empty());
    let prompts = llm.prompts().await;
    assert!(prompts.last().unwrap().contains("'report.pdf' does not contain relevant information"));
}

#[tokio::test]
async fn empty_index_still_answers() {
    let pipeline = pipeline(
        QueryConfig::default(),
        Arc::new(MockEmbeddingProvider::new(3)),
        Arc::new(InMemoryVectorStore::new()),
        vec![Arc::new(MockGenerationProvider::new("primary"))],
    );

    let answer = pipeline.process_query("What is the invoice number?", None).await;

    assert!(!answer.text.is_empty());
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn repeated_question_is_served_from_cache() {
    let embedder = embedder();
    let llm = llm(r#"{"scope": "all", "document": null, "is_generic": false}"#);
    let store = seeded_store().await;
    let pipeline = pipeline(QueryConfig::default(), embedder.clone(), store, vec![llm.clone()]);

    let first = pipeline.process_query("What is the invoice number?", None).await;
    let (embeds, generations) = (embedder.call_count(), llm.call_count());

    let second = pipeline.process_query("  what is the INVOICE number?  ", None).await;

    assert_eq!(first, second);
    assert_eq!(embedder.call_count(), embeds);
    assert_eq!(llm.call_count(), generations);
}

#[tokio::test]
async fn cache_entries_are_keyed_by_active_document() {
    let cache = Arc::new(MokaAnswerCache::new(16));
    let llm = llm(r#"{"scope": "all", "document": null, "is_generic": false}"#);
    let pipeline = QueryPipeline::builder()
        .embedding_provider(embedder())
        .vector_store(seeded_store().await)
        .generation_provider(llm.clone())
        .cache(cache.clone())
        .build()
        .unwrap();

    pipeline.process_query("What is the invoice number?", None).await;
    pipeline.process_query("What is the invoice number?", Some("invoice.pdf")).await;

    assert!(cache.get(&CacheKey::new("What is the invoice number?", None)).is_some());
    let scoped_key = CacheKey::new("What is the invoice number?", Some("invoice.pdf"));
    assert!(cache.get(&scoped_key).is_some());
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn fallback_provider_answers_when_primary_fails() {
    let primary = Arc::new(MockGenerationProvider::failing("primary"));
    let fallback = Arc::new(
        MockGenerationProvider::new("fallback")
            .with_rule(CLASSIFY, r#"{"scope": "all", "document": null, "is_generic": false}"#)
            .with_rule(GROUNDED, "Answer from fallback."),
    );
    let pipeline = pipeline(
        QueryConfig::default(),
        embedder(),
        seeded_store().await,
        vec![primary.clone(), fallback.clone()],
    );

    let answer = pipeline.process_query("What is the invoice number?", None).await;

    assert_eq!(answer.text, "Answer from fallback.");
    assert_eq!(answer.sources, vec!["invoice.pdf".to_string()]);
    assert_eq!(primary.prompts().await, fallback.prompts().await);
}

#[tokio::test]
async fn exhausted_chain_returns_error_text_and_is_not_cached() {
    let primary = Arc::new(MockGenerationProvider::failing("primary"));
    let fallback = Arc::new(MockGenerationProvider::failing("fallback"));
    let pipeline = pipeline(
        QueryConfig::default(),
        embedder(),
        seeded_store().await,
        vec![primary.clone(), fallback],
    );

    let answer = pipeline.process_query("What is the invoice number?", None).await;
    assert!(answer.text.starts_with("Sorry, I could not generate an answer right now."));
    assert!(answer.text.contains("primary"));
    assert!(answer.text.contains("fallback"));

    let calls = primary.call_count();
    pipeline.process_query("What is the invoice number?", None).await;
    assert!(primary.call_count() > calls);
    assert!(pipeline.cache().get(&CacheKey::new("What is the invoice number?", None)).is_none());
}

#[tokio::test]
async fn malformed_classification_searches_everything() {
    let llm = llm("I think the user wants the invoice");
    let pipeline = pipeline(QueryConfig::default(), embedder(), seeded_store().await, vec![llm]);

    let answer = pipeline.process_query("What is the invoice number?", Some("report.pdf")).await;

    assert_eq!(answer.sources, vec!["invoice.pdf".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unavailable_embedder_degrades_to_conversational() {
    let embedder = Arc::new(MockEmbeddingProvider::unavailable(3));
    let config = QueryConfig::builder()
        .embed_attempts(3)
        .embed_retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();
    let pipeline = pipeline(
        config,
        embedder.clone(),
        seeded_store().await,
        vec![llm(r#"{"scope": "all", "document": null, "is_generic": false}"#)],
    );

    let answer = pipeline.process_query("What is the invoice number?", None).await;

    assert_eq!(answer.text, "Happy to help!");
    assert!(answer.sources.is_empty());
    assert_eq!(embedder.call_count(), 3);
}

#[tokio::test]
async fn expansion_merges_variant_results() {
    let llm = Arc::new(
        MockGenerationProvider::new("primary")
            .with_rule(CLASSIFY, r#"{"scope": "all", "document": null, "is_generic": false}"#)
            .with_rule(
                EXPAND,
                r#"{"is_generic": false, "queries": ["invoice id", "Who wrote the report?"]}"#,
            )
            .with_rule(GROUNDED, "grounded"),
    );
    let embedder = embedder();
    let config = QueryConfig::builder().expand_queries(true).build().unwrap();
    let pipeline = pipeline(config, embedder.clone(), seeded_store().await, vec![llm.clone()]);

    // The original question matches nothing; the "invoice id" variant does.
    let answer = pipeline.process_query("Summarize this file", None).await;

    assert_eq!(answer.text, "grounded");
    assert_eq!(answer.sources, vec!["invoice.pdf".to_string()]);
    assert_eq!(embedder.call_count(), 3);
}

#[tokio::test]
async fn expander_can_mark_question_generic() {
    let llm = Arc::new(
        MockGenerationProvider::new("primary")
            .with_rule(CLASSIFY, r#"{"scope": "all", "document": null, "is_generic": false}"#)
            .with_rule(EXPAND, r#"{"is_generic": true, "queries": []}"#)
            .with_default_reply("Hello!"),
    );
    let embedder = embedder();
    let config = QueryConfig::builder().expand_queries(true).build().unwrap();
    let pipeline = pipeline(config, embedder.clone(), seeded_store().await, vec![llm]);

    let answer = pipeline.process_query("Thanks!", None).await;

    assert_eq!(answer.text, "Hello!");
    assert!(answer.sources.is_empty());
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn blank_question_is_answered_without_collaborators() {
    let embedder = embedder();
    let llm = llm("{}");
    let store = seeded_store().await;
    let pipeline = pipeline(QueryConfig::default(), embedder.clone(), store, vec![llm.clone()]);

    let answer = pipeline.ask(&QueryRequest::new("   ")).await;

    assert!(!answer.text.is_empty());
    assert!(answer.sources.is_empty());
    assert_eq!(embedder.call_count(), 0);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn clear_index_empties_store_and_cache() {
    let store = seeded_store().await;
    let llm = llm(r#"{"scope": "all", "document": null, "is_generic": false}"#);
    let pipeline = pipeline(QueryConfig::default(), embedder(), store.clone(), vec![llm]);

    let before = pipeline.process_query("What is the invoice number?", None).await;
    assert_eq!(before.sources, vec!["invoice.pdf".to_string()]);

    pipeline.clear_index().await.unwrap();
    assert!(store.is_empty().await);

    let after = pipeline.process_query("What is the invoice number?", None).await;
    assert!(after.sources.is_empty());
}

#[tokio::test]
async fn health_reports_each_collaborator() {
    let pipeline = pipeline(
        QueryConfig::default(),
        embedder(),
        seeded_store().await,
        vec![
            Arc::new(MockGenerationProvider::new("primary")),
            Arc::new(MockGenerationProvider::failing("fallback")),
        ],
    );

    let report = pipeline.health().await;

    assert_eq!(report.embedder, ComponentStatus::Reachable);
    assert_eq!(report.vector_store, ComponentStatus::Reachable);
    assert_eq!(report.generation.len(), 2);
    assert_eq!(report.generation[0], ("primary".to_string(), ComponentStatus::Reachable));
    assert_eq!(report.generation[1].0, "fallback");
    assert!(!report.generation[1].1.is_reachable());
    assert!(!report.is_healthy());
}

#[tokio::test]
async fn concurrent_queries_share_one_pipeline() {
    let llm = llm(r#"{"scope": "all", "document": null, "is_generic": false}"#);
    let store = seeded_store().await;
    let pipeline = Arc::new(pipeline(QueryConfig::default(), embedder(), store, vec![llm]));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let active = if i % 2 == 0 { None } else { Some("invoice.pdf") };
                pipeline.process_query("What is the invoice number?", active).await
            })
        })
        .collect();

    for handle in handles {
        let answer = handle.await.unwrap();
        assert_eq!(answer.sources, vec!["invoice.pdf".to_string()]);
    }
}
