//! End-to-end tests of the RAG pipeline against scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tinyrag_core::{
    AnswerOutcome, AnswerRequest, AnswerUpdate, EmbedMode, EmbeddingProvider, ErrorKind,
    FragmentStream, Generator, InMemoryVectorStore, Localizer, Message, RagConfig, RagError,
    RagPipeline,
    Reranker, Result, RetrievedDocument, Role, Stage, VectorStore,
};

const DIM: usize = 3;

// ── Scripted collaborators ─────────────────────────────────────────

/// Embeds every text as a vector derived from its length.
#[derive(Default)]
struct MockEmbedder {
    query_mode: bool,
    fail: bool,
    calls: AtomicUsize,
    modes: Mutex<Vec<EmbedMode>>,
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);
        if self.fail {
            return Err(RagError::Embedding { provider: "mock".into(), message: "offline".into() });
        }
        Ok(vec![text.len() as f32, 1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn supports_query_mode(&self) -> bool {
        self.query_mode
    }
}

/// Returns the same candidates for every query.
struct ScriptedStore {
    results: Vec<RetrievedDocument>,
    queries: AtomicUsize,
}

impl ScriptedStore {
    fn new(results: &[(&str, f32)]) -> Self {
        Self {
            results: results
                .iter()
                .map(|(content, distance)| RetrievedDocument {
                    content: content.to_string(),
                    distance: *distance,
                })
                .collect(),
            queries: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn create(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, _content: &str, _embedding: &[f32]) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _embedding: &[f32], _k: usize) -> Result<Vec<RetrievedDocument>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.clone())
    }

    async fn dimensions(&self) -> Result<Option<usize>> {
        Ok(Some(DIM))
    }
}

/// Returns a fixed score list regardless of the candidates.
struct ScriptedReranker {
    scores: Vec<f32>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedReranker {
    fn new(scores: &[f32]) -> Self {
        Self { scores: scores.to_vec(), calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn score(&self, _query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().extend(documents.iter().map(|d| d.to_string()));
        Ok(self.scores.clone())
    }
}

/// Streams a fixed list of fragments and records every conversation it receives.
struct RecordingGenerator {
    fragments: Vec<&'static str>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
    conversations: Mutex<Vec<Vec<Message>>>,
}

impl RecordingGenerator {
    fn new(fragments: &[&'static str]) -> Self {
        Self {
            fragments: fragments.to_vec(),
            fail_after: None,
            calls: AtomicUsize::new(0),
            conversations: Mutex::new(Vec::new()),
        }
    }

    fn failing_after(mut self, fragments: usize) -> Self {
        self.fail_after = Some(fragments);
        self
    }

    fn last_conversation(&self) -> Vec<Message> {
        self.conversations.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate_stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.conversations.lock().unwrap().push(messages.to_vec());

        let mut items: Vec<Result<String>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(RagError::Generation {
                generator: "recording".into(),
                message: "connection reset".into(),
            }));
        }
        Ok(Box::pin(stream::iter(items)))
    }
}

struct Harness {
    embedder: Arc<MockEmbedder>,
    store: Arc<ScriptedStore>,
    reranker: Arc<ScriptedReranker>,
    generator: Arc<RecordingGenerator>,
    pipeline: RagPipeline,
}

fn harness_with(
    embedder: MockEmbedder,
    store: ScriptedStore,
    reranker: ScriptedReranker,
    generator: RecordingGenerator,
) -> Harness {
    let embedder = Arc::new(embedder);
    let store = Arc::new(store);
    let reranker = Arc::new(reranker);
    let generator = Arc::new(generator);
    let pipeline = RagPipeline::builder()
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .reranker(reranker.clone())
        .generator(generator.clone())
        .build()
        .unwrap();
    Harness { embedder, store, reranker, generator, pipeline }
}

fn theft_harness() -> Harness {
    harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[
            ("Section 334: theft is punishable by up to three years.", 0.1),
            ("Section 1: definitions.", 0.2),
            ("Section 335: aggravated theft carries up to five years.", 0.3),
        ]),
        ScriptedReranker::new(&[0.8, -0.1, 0.5]),
        RecordingGenerator::new(&["Up to ", "three years."]),
    )
}

const THEFT_QUERY: &str = "What is the penalty for theft?";

// ── Answering ──────────────────────────────────────────────────────

#[tokio::test]
async fn irrelevant_documents_are_dropped_before_generation() {
    let h = theft_harness();
    let answer = h.pipeline.answer(AnswerRequest::new(THEFT_QUERY)).await.unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert_eq!(
        answer.sources,
        vec![
            "Section 334: theft is punishable by up to three years.",
            "Section 335: aggravated theft carries up to five years.",
        ]
    );
    assert_eq!(h.reranker.seen.lock().unwrap().len(), 3);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);

    let conversation = h.generator.last_conversation();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].role, Role::User);
    let prompt = &conversation[0].content;
    assert!(prompt.contains(
        "- Section 334: theft is punishable by up to three years.\n- Section 335: aggravated theft carries up to five years."
    ));
    assert!(!prompt.contains("Section 1: definitions."));
    assert!(prompt.contains("QUESTION: What is the penalty for theft?"));
}

#[tokio::test]
async fn response_appends_references_after_answer() {
    let h = theft_harness();
    let answer = h.pipeline.answer(AnswerRequest::new(THEFT_QUERY)).await.unwrap();

    assert_eq!(answer.text, "Up to three years.");
    assert_eq!(
        answer.response,
        "Up to three years.\n\nReferences:\n\
         - Section 334: theft is punishable by up to three years.\n\
         - Section 335: aggravated theft carries up to five years."
    );
}

#[tokio::test]
async fn empty_store_returns_no_results_without_reranking_or_generating() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[]),
        ScriptedReranker::new(&[]),
        RecordingGenerator::new(&["unused"]),
    );

    let answer = h.pipeline.answer(AnswerRequest::new(THEFT_QUERY).with_top_k(5)).await.unwrap();

    assert!(answer.is_no_results());
    assert_eq!(answer.text, h.pipeline.localizer().message(tinyrag_core::MessageKey::NoResults, "en"));
    assert_eq!(answer.response, answer.text);
    assert!(answer.sources.is_empty());
    assert_eq!(h.reranker.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn all_negative_scores_return_localized_no_results() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[("a", 0.1), ("b", 0.2)]),
        ScriptedReranker::new(&[-0.5, -3.0]),
        RecordingGenerator::new(&["unused"]),
    );

    let answer =
        h.pipeline.answer(AnswerRequest::new("คำถาม").with_language("th")).await.unwrap();

    assert!(answer.is_no_results());
    assert_eq!(answer.language, "th");
    assert_eq!(answer.text, h.pipeline.localizer().message(tinyrag_core::MessageKey::NoResults, "th"));
    assert_eq!(h.reranker.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn score_exactly_at_threshold_is_kept() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[("borderline", 0.4)]),
        ScriptedReranker::new(&[0.0]),
        RecordingGenerator::new(&["ok"]),
    );

    let answer = h.pipeline.answer(AnswerRequest::new("q")).await.unwrap();
    assert_eq!(answer.sources, vec!["borderline"]);
}

#[tokio::test]
async fn configured_threshold_replaces_default_cutoff() {
    let embedder = Arc::new(MockEmbedder::default());
    let generator = Arc::new(RecordingGenerator::new(&["ok"]));
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().relevance_threshold(0.6).build().unwrap())
        .embedding_provider(embedder)
        .vector_store(Arc::new(ScriptedStore::new(&[("high", 0.1), ("mid", 0.2)])))
        .reranker(Arc::new(ScriptedReranker::new(&[0.9, 0.5])))
        .generator(generator)
        .build()
        .unwrap();

    let answer = pipeline.answer(AnswerRequest::new("q")).await.unwrap();
    assert_eq!(answer.sources, vec!["high"]);
}

#[tokio::test]
async fn unknown_language_uses_default_template_and_messages() {
    let h = theft_harness();
    let answer =
        h.pipeline.answer(AnswerRequest::new(THEFT_QUERY).with_language("fr")).await.unwrap();

    assert_eq!(answer.language, "en");
    assert!(answer.response.contains("\n\nReferences:\n"));
    let prompt = &h.generator.last_conversation()[0].content;
    assert!(prompt.contains("INSTRUCTIONS:"));
}

#[tokio::test]
async fn japanese_request_uses_japanese_heading() {
    let h = theft_harness();
    let answer =
        h.pipeline.answer(AnswerRequest::new(THEFT_QUERY).with_language("ja")).await.unwrap();

    assert_eq!(answer.language, "ja");
    assert!(answer.response.contains("参考資料:"));
}

#[tokio::test]
async fn history_is_forwarded_and_left_untouched() {
    let h = theft_harness();
    let history = vec![Message::user("Hello"), Message::assistant("Hi, ask me about the law.")];
    let before = history.clone();

    h.pipeline
        .answer(AnswerRequest::new(THEFT_QUERY).with_history(&history))
        .await
        .unwrap();

    assert_eq!(history, before);
    let conversation = h.generator.last_conversation();
    assert_eq!(conversation.len(), 3);
    assert_eq!(&conversation[..2], &before[..]);
    assert_eq!(conversation[2].role, Role::User);
}

#[tokio::test]
async fn identical_requests_yield_identical_answers() {
    let h = theft_harness();
    let first = h.pipeline.answer(AnswerRequest::new(THEFT_QUERY)).await.unwrap();
    let second = h.pipeline.answer(AnswerRequest::new(THEFT_QUERY)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn query_mode_is_used_only_when_supported() {
    let h = harness_with(
        MockEmbedder { query_mode: true, ..Default::default() },
        ScriptedStore::new(&[]),
        ScriptedReranker::new(&[]),
        RecordingGenerator::new(&[]),
    );
    h.pipeline.answer(AnswerRequest::new("q")).await.unwrap();
    assert_eq!(*h.embedder.modes.lock().unwrap(), vec![EmbedMode::Query]);

    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[]),
        ScriptedReranker::new(&[]),
        RecordingGenerator::new(&[]),
    );
    h.pipeline.answer(AnswerRequest::new("q")).await.unwrap();
    assert_eq!(*h.embedder.modes.lock().unwrap(), vec![EmbedMode::Document]);
}

#[tokio::test]
async fn per_request_top_k_overrides_config() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[("a", 0.1), ("b", 0.2), ("c", 0.3)]),
        ScriptedReranker::new(&[1.0, 1.0, 1.0]),
        RecordingGenerator::new(&["ok"]),
    );

    let err = h.pipeline.answer(AnswerRequest::new("q").with_top_k(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContractViolation);

    let err = h.pipeline.answer(AnswerRequest::new("q").with_top_k(0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ── Failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn reranker_score_count_mismatch_is_a_contract_violation() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[("a", 0.1), ("b", 0.2), ("c", 0.3)]),
        ScriptedReranker::new(&[0.5, 0.5]),
        RecordingGenerator::new(&["unused"]),
    );

    let err = h.pipeline.answer(AnswerRequest::new("q")).await.unwrap_err();
    assert!(matches!(err, RagError::ContractViolation { .. }));
    assert_eq!(err.kind(), ErrorKind::ContractViolation);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failure_aborts_with_stage() {
    let h = harness_with(
        MockEmbedder { fail: true, ..Default::default() },
        ScriptedStore::new(&[("a", 0.1)]),
        ScriptedReranker::new(&[1.0]),
        RecordingGenerator::new(&["unused"]),
    );

    let err = h.pipeline.answer(AnswerRequest::new("q")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert_eq!(err.stage(), Some(Stage::Embedding));
    assert_eq!(h.store.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_is_reported_at_generating_stage() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[("a", 0.1)]),
        ScriptedReranker::new(&[1.0]),
        RecordingGenerator::new(&["partial"]).failing_after(1),
    );

    let err = h.pipeline.answer(AnswerRequest::new("q")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert_eq!(err.stage(), Some(Stage::Generating));
}

#[test]
fn builder_requires_every_collaborator() {
    let err = RagPipeline::builder()
        .embedding_provider(Arc::new(MockEmbedder::default()))
        .build()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

fn builder_with(config: Option<RagConfig>, localizer: Option<Localizer>) -> Result<RagPipeline> {
    let mut builder = RagPipeline::builder()
        .embedding_provider(Arc::new(MockEmbedder::default()))
        .vector_store(Arc::new(ScriptedStore::new(&[("a", 0.1)])))
        .reranker(Arc::new(ScriptedReranker::new(&[1.0])))
        .generator(Arc::new(RecordingGenerator::new(&["ok"])));
    if let Some(config) = config {
        builder = builder.config(config);
    }
    if let Some(localizer) = localizer {
        builder = builder.localizer(localizer);
    }
    builder.build()
}

#[test]
fn builder_rejects_localizer_with_other_default_language() {
    let config = RagConfig::builder().default_language("th").build().unwrap();

    let err = builder_with(Some(config), Some(Localizer::default())).err().unwrap();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("'th'"), "{err}");
}

#[tokio::test]
async fn matching_localizer_and_config_fall_back_to_shared_default() {
    let config = RagConfig::builder().default_language("th").build().unwrap();
    let localizer = Localizer::builder().default_language("th").build().unwrap();
    let pipeline = builder_with(Some(config), Some(localizer)).unwrap();

    let answer =
        pipeline.answer(AnswerRequest::new("q").with_language("fr")).await.unwrap();

    assert_eq!(answer.language, "th");
}

#[tokio::test]
async fn localizer_without_config_sets_default_language() {
    let localizer = Localizer::builder().default_language("ja").build().unwrap();
    let pipeline = builder_with(None, Some(localizer)).unwrap();

    assert_eq!(pipeline.config().default_language, "ja");
    let answer =
        pipeline.answer(AnswerRequest::new("q").with_language("fr")).await.unwrap();
    assert_eq!(answer.language, "ja");
}

// ── Streaming ──────────────────────────────────────────────────────

/// Produces an endless-looking fragment stream and counts how many
/// fragments were actually pulled from it.
struct PullCountingGenerator {
    pulls: Arc<AtomicUsize>,
}

#[async_trait]
impl Generator for PullCountingGenerator {
    fn name(&self) -> &str {
        "pull-counting"
    }

    async fn generate_stream(&self, _messages: &[Message]) -> Result<FragmentStream> {
        let pulls = self.pulls.clone();
        Ok(Box::pin(stream::iter(0..100).map(move |i| {
            pulls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, RagError>(format!("{i} "))
        })))
    }
}

#[tokio::test]
async fn dropping_answer_stream_stops_pulling_fragments() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(MockEmbedder::default()))
        .vector_store(Arc::new(ScriptedStore::new(&[("a", 0.1)])))
        .reranker(Arc::new(ScriptedReranker::new(&[1.0])))
        .generator(Arc::new(PullCountingGenerator { pulls: pulls.clone() }))
        .build()
        .unwrap();

    let mut updates = pipeline.answer_stream(AnswerRequest::new("q")).await.unwrap();
    let first = updates.next().await.unwrap().unwrap();
    assert_eq!(first, AnswerUpdate::Partial("0 ".into()));
    drop(updates);

    assert_eq!(pulls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn streamed_answer_matches_blocking_answer() {
    let h = theft_harness();
    let blocking = h.pipeline.answer(AnswerRequest::new(THEFT_QUERY)).await.unwrap();

    let updates: Vec<AnswerUpdate> = h
        .pipeline
        .answer_stream(AnswerRequest::new(THEFT_QUERY))
        .await
        .unwrap()
        .map(|u| u.unwrap())
        .collect()
        .await;

    assert_eq!(
        updates[..2],
        [AnswerUpdate::Partial("Up to ".into()), AnswerUpdate::Partial("Up to three years.".into())]
    );
    assert_eq!(updates.len(), 3);
    match &updates[2] {
        AnswerUpdate::Complete(answer) => assert_eq!(answer, &blocking),
        other => panic!("expected final answer, got {other:?}"),
    }
}

#[tokio::test]
async fn streamed_no_results_yields_single_complete_update() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[]),
        ScriptedReranker::new(&[]),
        RecordingGenerator::new(&["unused"]),
    );

    let updates: Vec<_> =
        h.pipeline.answer_stream(AnswerRequest::new("q")).await.unwrap().collect().await;

    assert_eq!(updates.len(), 1);
    assert!(matches!(&updates[0], Ok(AnswerUpdate::Complete(a)) if a.is_no_results()));
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stream_error_ends_the_stream() {
    let h = harness_with(
        MockEmbedder::default(),
        ScriptedStore::new(&[("a", 0.1)]),
        ScriptedReranker::new(&[1.0]),
        RecordingGenerator::new(&["one ", "two"]).failing_after(1),
    );

    let updates: Vec<_> =
        h.pipeline.answer_stream(AnswerRequest::new("q")).await.unwrap().collect().await;

    assert_eq!(updates.len(), 2);
    assert!(matches!(&updates[0], Ok(AnswerUpdate::Partial(t)) if t == "one "));
    let err = updates[1].as_ref().unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Generating));
}

// ── Store lifecycle and ingestion ──────────────────────────────────

fn ingest_pipeline(store: Arc<InMemoryVectorStore>, embedder: Arc<MockEmbedder>) -> RagPipeline {
    RagPipeline::builder()
        .embedding_provider(embedder)
        .vector_store(store)
        .reranker(Arc::new(tinyrag_core::NoOpReranker))
        .generator(Arc::new(RecordingGenerator::new(&["ok"])))
        .build()
        .unwrap()
}

#[tokio::test]
async fn create_store_rejects_dimension_mismatch() {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create(DIM + 1).await.unwrap();

    let pipeline = ingest_pipeline(store, Arc::new(MockEmbedder::default()));
    let err = pipeline.create_store().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn create_store_is_idempotent() {
    let pipeline =
        ingest_pipeline(Arc::new(InMemoryVectorStore::new()), Arc::new(MockEmbedder::default()));
    pipeline.create_store().await.unwrap();
    pipeline.create_store().await.unwrap();
    assert_eq!(pipeline.vector_store().dimensions().await.unwrap(), Some(DIM));
}

#[tokio::test]
async fn ingest_skips_blank_and_duplicate_texts() {
    let store = Arc::new(InMemoryVectorStore::new());
    let embedder = Arc::new(MockEmbedder::default());
    let pipeline = ingest_pipeline(store.clone(), embedder.clone());
    pipeline.create_store().await.unwrap();

    let report = pipeline.ingest(&["alpha", "", "beta", "alpha", "   "]).await.unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 3);
    assert_eq!(store.len().await, 2);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    assert!(embedder.modes.lock().unwrap().iter().all(|m| *m == EmbedMode::Document));
}

#[tokio::test]
async fn ingested_documents_are_answerable() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = ingest_pipeline(store, Arc::new(MockEmbedder::default()));
    pipeline.create_store().await.unwrap();
    pipeline.ingest(&["short", "a much longer document"]).await.unwrap();

    let answer = pipeline.answer(AnswerRequest::new("tiny").with_top_k(1)).await.unwrap();
    assert_eq!(answer.sources, vec!["short"]);
}

#[tokio::test]
async fn ingest_into_uncreated_store_fails_at_ingesting_stage() {
    let pipeline =
        ingest_pipeline(Arc::new(InMemoryVectorStore::new()), Arc::new(MockEmbedder::default()));
    let err = pipeline.ingest(&["x"]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert_eq!(err.stage(), Some(Stage::Ingesting));
}
