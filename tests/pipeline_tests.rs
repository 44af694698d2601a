//! End-to-end pipeline behavior with deterministic test doubles.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{ConstantEmbedder, HashEmbedder, ScriptedModel};
use docqa::{
    ChatMessage, ChatRole, DocumentStore, FixedSizeChunker, QaConfig, QaError, QaPipeline, Session,
};

fn pipeline(
    embedder: Arc<HashEmbedder>,
    model: Arc<ScriptedModel>,
    config: QaConfig,
) -> QaPipeline {
    QaPipeline::builder()
        .config(config.clone())
        .embedding_provider(embedder)
        .language_model(model)
        .chunker(Arc::new(FixedSizeChunker::from_config(&config)))
        .build()
        .unwrap()
}

fn fund_store(dir: &Path) -> DocumentStore {
    let store = DocumentStore::new(dir);
    store.save(b"Fund X returns 5% annually", "fund.txt").unwrap();
    store
}

#[tokio::test]
async fn build_or_load_is_idempotent() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let persist = storage.path().join("index");

    let store = DocumentStore::new(docs.path());
    store.save(b"Fund X returns 5% annually. Fund X invests in bonds.", "fund.txt").unwrap();
    store.save(b"Fund Y returns 2% annually. Fund Y invests in equities.", "other.txt").unwrap();

    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    let pipeline = pipeline(Arc::clone(&embedder), model, QaConfig::default());

    let first = pipeline.build_or_load(&store, &persist).await.unwrap();
    let calls_after_build = embedder.call_count();
    assert!(calls_after_build > 0);

    let results_first = pipeline.retrieve(&first, "What is the return of Fund X?").await.unwrap();

    // Second call must load the persisted index, not rebuild it: the only
    // new embedding call is for the query itself.
    let second = pipeline.build_or_load(&store, &persist).await.unwrap();
    assert_eq!(second.len(), first.len());
    assert_eq!(embedder.call_count(), calls_after_build + 1);

    let results_second = pipeline.retrieve(&second, "What is the return of Fund X?").await.unwrap();
    assert_eq!(results_first.len(), results_second.len());
    for (a, b) in results_first.iter().zip(&results_second) {
        assert_eq!(a.chunk.id, b.chunk.id);
        assert_eq!(a.score, b.score);
    }
}

#[tokio::test]
async fn empty_document_directory_fails_without_artifacts() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let persist = storage.path().join("index");

    let store = DocumentStore::new(docs.path());
    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    let pipeline = pipeline(embedder, model, QaConfig::default());

    let err = pipeline.build_or_load(&store, &persist).await.unwrap_err();
    assert!(matches!(err, QaError::NoDocuments { .. }));
    assert!(!persist.exists(), "a failed build must leave no persisted artifacts");
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_provider_call() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();

    let store = fund_store(docs.path());
    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    let pipeline = pipeline(Arc::clone(&embedder), Arc::clone(&model), QaConfig::default());

    let index = pipeline.build_or_load(&store, &storage.path().join("index")).await.unwrap();
    let calls_after_build = embedder.call_count();

    let err = pipeline.answer(&index, "   \t\n").await.unwrap_err();
    assert!(matches!(err, QaError::EmptyQuery));

    let mut history = Vec::new();
    let err = pipeline.chat(&index, &mut history, "").await.unwrap_err();
    assert!(matches!(err, QaError::EmptyQuery));

    assert_eq!(embedder.call_count(), calls_after_build, "no embedding call for a blank query");
    assert_eq!(model.call_count(), 0, "no generation call for a blank query");
    assert!(history.is_empty());
}

#[tokio::test]
async fn one_shot_answer_cites_the_fund_document() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();

    let store = fund_store(docs.path());
    let model = Arc::new(ScriptedModel::new(&["Fund X returns 5% annually."]));
    let config = QaConfig::builder().top_k(5).similarity_cutoff(0.8).build().unwrap();
    let pipeline = QaPipeline::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(ConstantEmbedder::new(8)))
        .language_model(model.clone())
        .chunker(Arc::new(FixedSizeChunker::from_config(&config)))
        .build()
        .unwrap();

    let index = pipeline.build_or_load(&store, &storage.path().join("index")).await.unwrap();
    let answer = pipeline.answer(&index, "What is the return of Fund X?").await.unwrap();

    assert!(answer.text.contains("5%"));
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.citations[0].file_name, "fund.txt");
    assert_eq!(answer.citations[0].page_label, "1");
    assert!(answer.citations[0].score >= 0.8);
    assert!(answer.citations[0].excerpt.contains("Fund X"));
}

#[tokio::test]
async fn retrieval_below_cutoff_yields_empty_result_not_error() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();

    let store = fund_store(docs.path());
    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    // Hash embeddings of unrelated strings land far below a cutoff of 0.999.
    let config = QaConfig::builder().similarity_cutoff(0.999).build().unwrap();
    let pipeline = pipeline(embedder, model, config);

    let index = pipeline.build_or_load(&store, &storage.path().join("index")).await.unwrap();
    let results = pipeline.retrieve(&index, "completely unrelated query text").await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn chat_condenses_follow_up_before_retrieval() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();

    let store = fund_store(docs.path());
    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[
        "What is Fund X's risk rating?",
        "Fund X has a moderate risk rating.",
    ]));
    let pipeline = pipeline(Arc::clone(&embedder), Arc::clone(&model), QaConfig::default());

    let index = pipeline.build_or_load(&store, &storage.path().join("index")).await.unwrap();

    let mut history = vec![
        ChatMessage::user("What is Fund X's return?"),
        ChatMessage::assistant("Fund X returns 5% annually."),
    ];
    let answer = pipeline.chat(&index, &mut history, "And its risk rating?").await.unwrap();

    // The condensation request saw the prior turns and the follow-up.
    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].1[0].content.contains("What is Fund X's return?"));
    assert!(calls[0].1[0].content.contains("Follow-up message: And its risk rating?"));

    // Retrieval used the condensed standalone question, which resolves
    // "its" to "Fund X".
    let condensed_query = embedder.calls().last().unwrap().clone();
    assert!(condensed_query.contains("Fund X"), "retrieval query was: {condensed_query}");

    // Both the user message and the answer were appended.
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], ChatMessage::user("And its risk rating?"));
    assert_eq!(history[3].role, ChatRole::Assistant);
    assert_eq!(history[3].content, answer.text);
}

#[tokio::test]
async fn first_chat_turn_skips_condensation() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();

    let store = fund_store(docs.path());
    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&["Fund X returns 5% annually."]));
    let pipeline = pipeline(embedder, Arc::clone(&model), QaConfig::default());

    let index = pipeline.build_or_load(&store, &storage.path().join("index")).await.unwrap();

    let mut history = Vec::new();
    pipeline.chat(&index, &mut history, "What is the return of Fund X?").await.unwrap();

    // With no prior turns there is nothing to condense: one generation call.
    assert_eq!(model.call_count(), 1);
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn failed_generation_leaves_history_untouched() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();

    let store = fund_store(docs.path());
    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    let pipeline = pipeline(embedder, Arc::clone(&model), QaConfig::default());

    let index = pipeline.build_or_load(&store, &storage.path().join("index")).await.unwrap();

    let mut history = Vec::new();
    let err = pipeline.chat(&index, &mut history, "What is the return?").await.unwrap_err();
    assert!(matches!(err, QaError::Generation { .. }));
    assert!(history.is_empty());
}

#[tokio::test]
async fn session_invalidates_cached_index_on_new_upload() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let persist = storage.path().join("index");

    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    let pipeline = pipeline(Arc::clone(&embedder), model, QaConfig::default());

    let mut session = Session::new(DocumentStore::new(docs.path()), &persist);
    session.upload(b"Fund X returns 5% annually", "fund.txt").unwrap();

    let first = session.index(&pipeline).await.unwrap();
    let first_len = first.len();

    // Cached: asking again builds nothing new.
    let calls_after_build = embedder.call_count();
    let again = session.index(&pipeline).await.unwrap();
    assert_eq!(again.len(), first_len);
    assert_eq!(embedder.call_count(), calls_after_build);

    // A new upload changes the document set; the next index call rebuilds
    // over all stored documents instead of reusing the stale index.
    session.upload(b"Fund Y has a high risk rating", "risk.txt").unwrap();
    let rebuilt = session.index(&pipeline).await.unwrap();
    assert!(rebuilt.len() > first_len);
    assert!(embedder.call_count() > calls_after_build);
    assert!(
        rebuilt.chunks().iter().any(|c| c.file_name == "risk.txt"),
        "rebuilt index must cover the new document"
    );
}

#[tokio::test]
async fn session_rebuilds_when_content_changes_but_size_does_not() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let persist = storage.path().join("index");

    let embedder = Arc::new(HashEmbedder::new(32));
    let model = Arc::new(ScriptedModel::new(&[]));
    let pipeline = pipeline(Arc::clone(&embedder), model, QaConfig::default());

    let mut session = Session::new(DocumentStore::new(docs.path()), &persist);
    session.upload(b"Fund X returns 5% annually", "fund.txt").unwrap();

    let first = session.index(&pipeline).await.unwrap();
    assert!(first.chunks().iter().any(|c| c.text.contains("5%")));

    // Overwrite with different content of the same byte length. The cached
    // index must not survive the replacement.
    session.upload(b"Fund X returns 9% annually", "fund.txt").unwrap();
    let rebuilt = session.index(&pipeline).await.unwrap();

    assert!(rebuilt.chunks().iter().any(|c| c.text.contains("9%")));
    assert!(!rebuilt.chunks().iter().any(|c| c.text.contains("5%")));
}
