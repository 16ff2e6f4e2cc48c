pub mod lexical;
pub mod ranking;
pub mod vector;

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, EmbeddingGenerator, Error, Result};
use cdl_domain::{query, text};
use cdl_storage::models::Document;
use ranking::{CosineRanker, SimilarityRanker};

/// Native similarity-search engine.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Never fails: engine errors are reported as [`VectorOutcome::Failed`].
	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		candidate_pool: u32,
	) -> BoxFuture<'a, VectorOutcome>;

	fn upsert<'a>(&'a self, doc_id: Uuid, vector: &'a [f32]) -> BoxFuture<'a, Result<()>>;

	fn remove<'a>(&'a self, doc_id: Uuid) -> BoxFuture<'a, Result<()>>;

	/// `false` when no engine is configured.
	fn is_enabled(&self) -> bool {
		true
	}
}

/// Read-only access to stored documents, as needed by the search pipeline.
pub trait DocumentSource
where
	Self: Send + Sync,
{
	/// Case-insensitive substring match across title, content, tags and authors, in insertion
	/// order, at most `limit` rows.
	fn find_lexical<'a>(
		&'a self,
		term: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Document>>>;

	/// Loads documents by id. Unknown ids are skipped.
	fn fetch_by_ids<'a>(&'a self, doc_ids: &'a [Uuid]) -> BoxFuture<'a, Result<Vec<Document>>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
	pub doc_id: Uuid,
	/// Already in `[0, 1]`.
	pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorOutcome {
	Matches(Vec<VectorHit>),
	/// No engine configured.
	Unavailable,
	/// Engine queried successfully with zero matches.
	Empty,
	/// Engine configured but the query failed.
	Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPath {
	Vector,
	Lexical,
}
impl SearchPath {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Vector => "vector",
			Self::Lexical => "lexical",
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
	pub id: Uuid,
	pub title: String,
	/// Leading excerpt of the content.
	pub content: String,
	pub authors: Vec<String>,
	pub tags: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub upload_date: OffsetDateTime,
	pub score: f32,
}
impl SearchResult {
	pub fn from_document(doc: Document, score: f32, excerpt_chars: usize) -> Self {
		Self {
			id: doc.doc_id,
			title: doc.title,
			content: text::excerpt(&doc.content, excerpt_chars),
			authors: doc.authors,
			tags: doc.tags,
			upload_date: doc.upload_date,
			score,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub path: SearchPath,
	pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
	pub vector_pool_factor: u32,
	pub lexical_pool_factor: u32,
	pub excerpt_chars: usize,
}
impl From<&cdl_config::Search> for SearchSettings {
	fn from(cfg: &cdl_config::Search) -> Self {
		Self {
			vector_pool_factor: cfg.vector_pool_factor,
			lexical_pool_factor: cfg.lexical_pool_factor,
			excerpt_chars: cfg.excerpt_chars as usize,
		}
	}
}

impl Default for SearchSettings {
	fn default() -> Self {
		Self::from(&cdl_config::Search::default())
	}
}

/// Hybrid search pipeline: `AttemptVector -> FallbackLexical -> Rank -> Done`.
///
/// The native engine is tried first. Any outcome other than a non-empty match set falls through
/// to the lexical matcher, whose candidates are scored against the query embedding, stably sorted
/// and truncated. Stages within one request run sequentially; concurrent requests share only
/// immutable state.
pub struct SearchOrchestrator {
	embedder: Arc<EmbeddingGenerator>,
	index: Arc<dyn VectorIndex>,
	source: Arc<dyn DocumentSource>,
	ranker: Arc<dyn SimilarityRanker>,
	settings: SearchSettings,
}
impl SearchOrchestrator {
	pub fn new(
		embedder: Arc<EmbeddingGenerator>,
		index: Arc<dyn VectorIndex>,
		source: Arc<dyn DocumentSource>,
		settings: SearchSettings,
	) -> Self {
		Self { embedder, index, source, ranker: Arc::new(CosineRanker), settings }
	}

	pub fn with_ranker(mut self, ranker: Arc<dyn SimilarityRanker>) -> Self {
		self.ranker = ranker;

		self
	}

	pub async fn search(&self, query: &str, limit: u32) -> Result<SearchResponse> {
		let valid = query::validate_search(query, limit)
			.map_err(|code| Error::Validation { message: code.message() })?;
		let query_vec = match self.embedder.embed(valid.term).await {
			Ok(vec) => Some(vec),
			Err(err) => {
				tracing::warn!(error = %err, "Query embedding failed. Using lexical path only.");

				None
			},
		};

		if let Some(vec) = query_vec.as_deref()
			&& let Some(items) = self.attempt_vector(vec, valid.limit).await
		{
			tracing::debug!(path = "vector", result_count = items.len(), "Search finished.");

			return Ok(SearchResponse { path: SearchPath::Vector, items });
		}

		let candidates = self.fallback_lexical(valid.term, valid.limit).await?;
		let candidate_count = candidates.len();
		let items = self.rank(query_vec.as_deref(), candidates, valid.limit);

		tracing::debug!(
			path = "lexical",
			candidate_count,
			result_count = items.len(),
			"Search finished."
		);

		Ok(SearchResponse { path: SearchPath::Lexical, items })
	}

	/// `Some` only when the native engine produced at least one hit that still exists in the
	/// store.
	async fn attempt_vector(&self, vec: &[f32], limit: u32) -> Option<Vec<SearchResult>> {
		let pool = query::candidate_pool(limit, self.settings.vector_pool_factor);
		let hits = match self.index.query(vec, limit, pool).await {
			VectorOutcome::Matches(hits) if !hits.is_empty() => hits,
			VectorOutcome::Matches(_) | VectorOutcome::Empty => {
				tracing::debug!("Vector index returned no matches.");

				return None;
			},
			VectorOutcome::Unavailable => {
				tracing::debug!("Vector index unavailable.");

				return None;
			},
			VectorOutcome::Failed { message } => {
				tracing::warn!(
					error = %message,
					"Vector index query failed. Falling back to lexical."
				);

				return None;
			},
		};
		let ids = hits.iter().map(|hit| hit.doc_id).collect::<Vec<_>>();
		let mut docs = match self.source.fetch_by_ids(&ids).await {
			Ok(docs) => docs.into_iter().map(|doc| (doc.doc_id, doc)).collect::<HashMap<_, _>>(),
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Vector hit hydration failed. Falling back to lexical."
				);

				return None;
			},
		};
		let items = hits
			.into_iter()
			.filter_map(|hit| {
				docs.remove(&hit.doc_id).map(|doc| {
					SearchResult::from_document(doc, hit.score, self.settings.excerpt_chars)
				})
			})
			.take(limit as usize)
			.collect::<Vec<_>>();

		if items.is_empty() {
			tracing::debug!(hit_count = ids.len(), "Vector hits are no longer stored.");

			return None;
		}

		Some(items)
	}

	async fn fallback_lexical(&self, term: &str, limit: u32) -> Result<Vec<Document>> {
		let pool = query::candidate_pool(limit, self.settings.lexical_pool_factor);

		self.source
			.find_lexical(term, pool)
			.await
			.map_err(|err| Error::Internal { message: format!("Lexical search failed: {err}") })
	}

	fn rank(
		&self,
		query_vec: Option<&[f32]>,
		candidates: Vec<Document>,
		limit: u32,
	) -> Vec<SearchResult> {
		ranking::rank(self.ranker.as_ref(), query_vec, candidates, limit as usize)
			.into_iter()
			.map(|(doc, score)| {
				SearchResult::from_document(doc, score, self.settings.excerpt_chars)
			})
			.collect()
	}
}
