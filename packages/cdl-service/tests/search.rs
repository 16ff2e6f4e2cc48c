use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use cdl_config::EmbeddingProviderConfig;
use cdl_service::{
	BoxFuture, CosineRanker, DisabledVectorIndex, DocumentSource, EmbeddingGenerator,
	EmbeddingProvider, Error, SearchOrchestrator, SearchPath, SearchSettings, SimilarityRanker,
	VectorHit, VectorIndex, VectorOutcome,
};
use cdl_storage::models::Document;

const DIM: u32 = 3;

fn provider_cfg() -> EmbeddingProviderConfig {
	toml::from_str(&format!(
		r#"
provider_id = "test"
api_base = "http://127.0.0.1:1"
api_key = "test-key"
path = "/embeddings"
model = "fake"
dimensions = {DIM}
timeout_ms = 1000
"#
	))
	.expect("Failed to parse provider config.")
}

/// Returns the same vector for every input.
struct FixedEmbedding {
	vector: Option<Vec<f32>>,
	calls: Arc<AtomicUsize>,
}
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, cdl_providers::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let result = match self.vector.as_ref() {
			Some(vector) => Ok(vec![vector.clone(); texts.len()]),
			None => Err(cdl_providers::Error::InvalidResponse {
				message: "Embedding backend is down.".to_string(),
			}),
		};

		Box::pin(async move { result })
	}
}

struct SpyIndex {
	outcome: VectorOutcome,
	calls: Arc<AtomicUsize>,
	last_pool: Arc<Mutex<Option<(u32, u32)>>>,
}
impl VectorIndex for SpyIndex {
	fn query<'a>(
		&'a self,
		_: &'a [f32],
		limit: u32,
		candidate_pool: u32,
	) -> BoxFuture<'a, VectorOutcome> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last_pool.lock().expect("lock") = Some((limit, candidate_pool));

		let outcome = self.outcome.clone();

		Box::pin(async move { outcome })
	}

	fn upsert<'a>(&'a self, _: Uuid, _: &'a [f32]) -> BoxFuture<'a, cdl_service::Result<()>> {
		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, _: Uuid) -> BoxFuture<'a, cdl_service::Result<()>> {
		Box::pin(async { Ok(()) })
	}
}

/// In-memory store with the same matching rules as the Postgres matcher.
#[derive(Default)]
struct MemoryStore {
	docs: Vec<Document>,
	fail_lexical: bool,
	fail_fetch: bool,
	lexical_calls: Arc<AtomicUsize>,
	fetch_calls: Arc<AtomicUsize>,
	last_lexical_limit: Arc<Mutex<Option<u32>>>,
}
impl DocumentSource for MemoryStore {
	fn find_lexical<'a>(
		&'a self,
		term: &'a str,
		limit: u32,
	) -> BoxFuture<'a, cdl_service::Result<Vec<Document>>> {
		self.lexical_calls.fetch_add(1, Ordering::SeqCst);
		*self.last_lexical_limit.lock().expect("lock") = Some(limit);

		let result = if self.fail_lexical {
			Err(Error::Storage { message: "connection reset".to_string() })
		} else {
			let needle = term.to_lowercase();
			let matches = |value: &str| value.to_lowercase().contains(&needle);

			Ok(self
				.docs
				.iter()
				.filter(|doc| {
					matches(&doc.title)
						|| matches(&doc.content)
						|| doc.tags.iter().any(|tag| matches(tag))
						|| doc.authors.iter().any(|author| matches(author))
				})
				.take(limit as usize)
				.cloned()
				.collect())
		};

		Box::pin(async move { result })
	}

	fn fetch_by_ids<'a>(
		&'a self,
		doc_ids: &'a [Uuid],
	) -> BoxFuture<'a, cdl_service::Result<Vec<Document>>> {
		self.fetch_calls.fetch_add(1, Ordering::SeqCst);

		let result = if self.fail_fetch {
			Err(Error::Storage { message: "connection reset".to_string() })
		} else {
			Ok(self.docs.iter().filter(|doc| doc_ids.contains(&doc.doc_id)).cloned().collect())
		};

		Box::pin(async move { result })
	}
}

struct CountingRanker {
	calls: Arc<AtomicUsize>,
}
impl SimilarityRanker for CountingRanker {
	fn score(&self, query: &[f32], document: Option<&[f32]>) -> f32 {
		self.calls.fetch_add(1, Ordering::SeqCst);

		CosineRanker.score(query, document)
	}
}

fn doc(seq: i64, title: &str, embedding: Option<Vec<f32>>) -> Document {
	let now = OffsetDateTime::now_utc();

	Document {
		doc_id: Uuid::new_v4(),
		seq,
		title: title.to_string(),
		content: format!("Notes about {title}."),
		authors: vec!["Ada".to_string()],
		tags: Vec::new(),
		file_path: None,
		metadata: json!({}),
		content_hash: String::new(),
		content_embedding: embedding,
		embedding_version: Some("test:fake:3".to_string()),
		upload_date: now,
		updated_at: now,
	}
}

struct Harness {
	orchestrator: SearchOrchestrator,
	embed_calls: Arc<AtomicUsize>,
	index_calls: Arc<AtomicUsize>,
	index_pool: Arc<Mutex<Option<(u32, u32)>>>,
	lexical_calls: Arc<AtomicUsize>,
	lexical_limit: Arc<Mutex<Option<u32>>>,
	fetch_calls: Arc<AtomicUsize>,
	rank_calls: Arc<AtomicUsize>,
}

fn harness(
	query_vec: Option<Vec<f32>>,
	outcome: Option<VectorOutcome>,
	store: MemoryStore,
) -> Harness {
	let embed_calls = Arc::new(AtomicUsize::new(0));
	let index_calls = Arc::new(AtomicUsize::new(0));
	let index_pool = Arc::new(Mutex::new(None));
	let rank_calls = Arc::new(AtomicUsize::new(0));
	let lexical_calls = store.lexical_calls.clone();
	let lexical_limit = store.last_lexical_limit.clone();
	let fetch_calls = store.fetch_calls.clone();
	let embedder = Arc::new(EmbeddingGenerator::new(
		provider_cfg(),
		Arc::new(FixedEmbedding { vector: query_vec, calls: embed_calls.clone() }),
	));
	let index: Arc<dyn VectorIndex> = match outcome {
		Some(outcome) => Arc::new(SpyIndex {
			outcome,
			calls: index_calls.clone(),
			last_pool: index_pool.clone(),
		}),
		None => Arc::new(DisabledVectorIndex),
	};
	let orchestrator =
		SearchOrchestrator::new(embedder, index, Arc::new(store), SearchSettings::default())
			.with_ranker(Arc::new(CountingRanker { calls: rank_calls.clone() }));

	Harness {
		orchestrator,
		embed_calls,
		index_calls,
		index_pool,
		lexical_calls,
		lexical_limit,
		fetch_calls,
		rank_calls,
	}
}

fn store_with(docs: Vec<Document>) -> MemoryStore {
	MemoryStore { docs, ..Default::default() }
}

fn titles(items: &[cdl_service::SearchResult]) -> Vec<&str> {
	items.iter().map(|item| item.title.as_str()).collect()
}

#[tokio::test]
async fn lexical_path_ranks_matching_documents_when_engine_is_absent() {
	let store = store_with(vec![
		doc(1, "Quality Assurance Basics", Some(vec![0.0, 1.0, 0.0])),
		doc(2, "Cooking Tips", Some(vec![1.0, 0.0, 0.0])),
		doc(3, "Quality Metrics in Testing", Some(vec![1.0, 0.1, 0.0])),
	]);
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store);
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Lexical);
	assert_eq!(
		titles(&response.items),
		vec!["Quality Metrics in Testing", "Quality Assurance Basics"]
	);
	assert!(response.items[0].score > response.items[1].score);
	assert!((response.items[1].score - 0.5).abs() < 1e-6);
	assert_eq!(h.rank_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn native_matches_pass_through_in_engine_order() {
	let docs = vec![
		doc(1, "Alpha", Some(vec![1.0, 0.0, 0.0])),
		doc(2, "Beta", Some(vec![0.0, 1.0, 0.0])),
		doc(3, "Gamma", Some(vec![0.0, 0.0, 1.0])),
	];
	let hits = vec![
		VectorHit { doc_id: docs[2].doc_id, score: 0.93 },
		VectorHit { doc_id: docs[0].doc_id, score: 0.81 },
		VectorHit { doc_id: docs[1].doc_id, score: 0.42 },
	];
	let h =
		harness(Some(vec![0.0, 0.0, 1.0]), Some(VectorOutcome::Matches(hits)), store_with(docs));
	let response = h.orchestrator.search("anything", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Vector);
	assert_eq!(titles(&response.items), vec!["Gamma", "Alpha", "Beta"]);
	assert_eq!(
		response.items.iter().map(|item| item.score).collect::<Vec<_>>(),
		vec![0.93, 0.81, 0.42]
	);
	assert_eq!(h.index_calls.load(Ordering::SeqCst), 1);
	assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 1);
	assert_eq!(h.lexical_calls.load(Ordering::SeqCst), 0);
	assert_eq!(h.rank_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_store_returns_empty_results() {
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, MemoryStore::default());
	let response = h.orchestrator.search("anything", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Lexical);
	assert!(response.items.is_empty());
	assert_eq!(h.lexical_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn out_of_range_limits_are_rejected_before_any_stage() {
	for limit in [0, 51] {
		let h = harness(
			Some(vec![1.0, 0.0, 0.0]),
			Some(VectorOutcome::Empty),
			store_with(vec![doc(1, "Quality", None)]),
		);
		let err = h.orchestrator.search("quality", limit).await.expect_err("Expected rejection.");

		assert!(matches!(err, Error::Validation { .. }), "Unexpected error: {err}");
		assert_eq!(h.embed_calls.load(Ordering::SeqCst), 0);
		assert_eq!(h.index_calls.load(Ordering::SeqCst), 0);
		assert_eq!(h.lexical_calls.load(Ordering::SeqCst), 0);
	}
}

#[tokio::test]
async fn boundary_limits_are_accepted() {
	for limit in [1, 50] {
		let docs = (0..60).map(|i| doc(i, &format!("Quality {i}"), None)).collect();
		let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store_with(docs));
		let response = h.orchestrator.search("quality", limit).await.expect("Search failed.");

		assert_eq!(response.items.len(), limit as usize);
	}
}

#[tokio::test]
async fn blank_query_is_rejected() {
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, MemoryStore::default());
	let err = h.orchestrator.search("   ", 10).await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error: {err}");
	assert_eq!(h.embed_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identical_embedding_scores_one_on_lexical_path() {
	let query_vec = vec![0.2, 0.4, 0.4];
	let h = harness(
		Some(query_vec.clone()),
		None,
		store_with(vec![doc(1, "Quality twin", Some(query_vec))]),
	);
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(response.items.len(), 1);
	assert!((response.items[0].score - 1.0).abs() < 1e-6, "score {}", response.items[0].score);
}

#[tokio::test]
async fn lexical_scores_are_non_increasing() {
	let embeddings = [
		Some(vec![-1.0, 0.0, 0.0]),
		None,
		Some(vec![0.3, 0.3, 0.9]),
		Some(vec![1.0, 0.2, 0.0]),
		Some(vec![0.0, 0.0]),
		Some(vec![0.5, -0.5, 0.1]),
	];
	let docs = embeddings
		.into_iter()
		.enumerate()
		.map(|(i, embedding)| doc(i as i64, &format!("Quality {i}"), embedding))
		.collect();
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store_with(docs));
	let response = h.orchestrator.search("quality", 50).await.expect("Search failed.");

	assert_eq!(response.items.len(), 6);
	assert!(response.items.windows(2).all(|pair| pair[0].score >= pair[1].score));
	assert!(response.items.iter().all(|item| (0.0..=1.0).contains(&item.score)));
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() {
	let docs = vec![
		doc(1, "Quality one", None),
		doc(2, "Quality two", None),
		doc(3, "Quality three", None),
	];
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store_with(docs));
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(titles(&response.items), vec!["Quality one", "Quality two", "Quality three"]);
}

#[tokio::test]
async fn failed_and_empty_engine_outcomes_fall_back_to_lexical() {
	for outcome in [
		VectorOutcome::Failed { message: "timeout".to_string() },
		VectorOutcome::Empty,
		VectorOutcome::Matches(Vec::new()),
	] {
		let h = harness(
			Some(vec![1.0, 0.0, 0.0]),
			Some(outcome),
			store_with(vec![doc(1, "Quality", Some(vec![1.0, 0.0, 0.0]))]),
		);
		let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

		assert_eq!(response.path, SearchPath::Lexical);
		assert_eq!(titles(&response.items), vec!["Quality"]);
		assert_eq!(h.index_calls.load(Ordering::SeqCst), 1);
		assert_eq!(h.lexical_calls.load(Ordering::SeqCst), 1);
	}
}

#[tokio::test]
async fn stale_vector_hits_are_dropped() {
	let kept = doc(1, "Kept", None);
	let hits = vec![
		VectorHit { doc_id: Uuid::new_v4(), score: 0.99 },
		VectorHit { doc_id: kept.doc_id, score: 0.7 },
	];
	let h = harness(
		Some(vec![1.0, 0.0, 0.0]),
		Some(VectorOutcome::Matches(hits)),
		store_with(vec![kept]),
	);
	let response = h.orchestrator.search("anything", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Vector);
	assert_eq!(titles(&response.items), vec!["Kept"]);
	assert_eq!(response.items[0].score, 0.7);
}

#[tokio::test]
async fn vector_hits_with_no_stored_documents_fall_back_to_lexical() {
	let hits = vec![VectorHit { doc_id: Uuid::new_v4(), score: 0.99 }];
	let h = harness(
		Some(vec![1.0, 0.0, 0.0]),
		Some(VectorOutcome::Matches(hits)),
		store_with(vec![doc(1, "Quality", None)]),
	);
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Lexical);
	assert_eq!(titles(&response.items), vec!["Quality"]);
}

#[tokio::test]
async fn hydration_failure_falls_back_to_lexical() {
	let stored = doc(1, "Quality", None);
	let hits = vec![VectorHit { doc_id: stored.doc_id, score: 0.9 }];
	let store = MemoryStore { docs: vec![stored], fail_fetch: true, ..Default::default() };
	let h = harness(Some(vec![1.0, 0.0, 0.0]), Some(VectorOutcome::Matches(hits)), store);
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Lexical);
	assert_eq!(h.lexical_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lexical_failure_after_vector_failure_is_internal() {
	let store = MemoryStore { fail_lexical: true, ..Default::default() };
	let h = harness(
		Some(vec![1.0, 0.0, 0.0]),
		Some(VectorOutcome::Failed { message: "down".to_string() }),
		store,
	);
	let err = h.orchestrator.search("quality", 10).await.expect_err("Expected internal error.");

	assert!(matches!(err, Error::Internal { .. }), "Unexpected error: {err}");
}

#[tokio::test]
async fn embedding_failure_serves_lexical_results_with_neutral_scores() {
	let h = harness(
		None,
		Some(VectorOutcome::Empty),
		store_with(vec![doc(1, "Quality", Some(vec![1.0, 0.0, 0.0]))]),
	);
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(response.path, SearchPath::Lexical);
	assert_eq!(response.items[0].score, 0.5);
	assert_eq!(h.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn candidate_pools_scale_with_limit() {
	let h = harness(
		Some(vec![1.0, 0.0, 0.0]),
		Some(VectorOutcome::Empty),
		store_with(vec![doc(1, "Quality", None)]),
	);

	h.orchestrator.search("quality", 7).await.expect("Search failed.");

	assert_eq!(*h.index_pool.lock().expect("lock"), Some((7, 70)));
	assert_eq!(*h.lexical_limit.lock().expect("lock"), Some(14));
}

#[tokio::test]
async fn results_carry_a_bounded_excerpt() {
	let mut long = doc(1, "Quality", None);

	long.content = "é".repeat(800);

	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store_with(vec![long]));
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");

	assert_eq!(response.items[0].content.chars().count(), 500);
	assert_eq!(response.items[0].authors, vec!["Ada".to_string()]);
}

#[tokio::test]
async fn lexical_match_covers_tags_and_authors() {
	let mut tagged = doc(1, "Untitled", None);
	let mut authored = doc(2, "Anonymous", None);

	tagged.tags = vec!["Qualitative".to_string()];
	authored.authors = vec!["Quinn Quality".to_string()];

	let store = store_with(vec![tagged, authored, doc(3, "Other", None)]);
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store);
	let response = h.orchestrator.search("QUALIT", 10).await.expect("Search failed.");

	assert_eq!(titles(&response.items), vec!["Untitled", "Anonymous"]);
}

#[tokio::test]
async fn response_serializes_path_and_rfc3339_dates() {
	let h = harness(Some(vec![1.0, 0.0, 0.0]), None, store_with(vec![doc(1, "Quality", None)]));
	let response = h.orchestrator.search("quality", 10).await.expect("Search failed.");
	let json = serde_json::to_value(&response).expect("Failed to serialize response.");

	assert_eq!(json["path"], "lexical");
	assert!(json["items"][0]["upload_date"].as_str().is_some_and(|date| date.contains('T')));
	assert!(json["items"][0]["id"].is_string());
}
