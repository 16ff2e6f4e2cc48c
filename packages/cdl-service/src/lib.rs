pub mod admin;
pub mod documents;
pub mod embedding;
pub mod search;
pub mod time_serde;

mod error;

pub use admin::{ReembedReport, RebuildReport};
pub use documents::{
	CreateDocumentRequest, DocumentCount, DocumentView, ListDocumentsRequest,
	UpdateDocumentRequest,
};
pub use embedding::EmbeddingGenerator;
pub use error::{Error, Result};
pub use search::{
	DocumentSource, SearchOrchestrator, SearchPath, SearchResponse, SearchResult, SearchSettings,
	VectorHit, VectorIndex, VectorOutcome,
	lexical::PgDocumentSource,
	ranking::{CosineRanker, SimilarityRanker},
	vector::{DisabledVectorIndex, QdrantVectorIndex},
};

use std::{future::Future, pin::Pin, sync::Arc};

use cdl_config::{Config, EmbeddingProviderConfig};
use cdl_providers::embedding as provider_embedding;
use cdl_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, cdl_providers::Result<Vec<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, cdl_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(provider_embedding::embed(cfg, texts))
	}
}

/// Process-wide service state. Built once at startup and shared behind an `Arc`.
pub struct CdlService {
	pub cfg: Config,
	pub db: Db,
	pub embedder: Arc<EmbeddingGenerator>,
	pub index: Arc<dyn VectorIndex>,
	pub orchestrator: SearchOrchestrator,
}
impl CdlService {
	pub fn new(cfg: Config, db: Db, index: Arc<dyn VectorIndex>) -> Self {
		Self::with_providers(cfg, db, index, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		index: Arc<dyn VectorIndex>,
		providers: Providers,
	) -> Self {
		let embedder =
			Arc::new(EmbeddingGenerator::new(cfg.providers.embedding.clone(), providers.embedding));
		let source = Arc::new(PgDocumentSource::new(db.pool.clone()));
		let orchestrator = SearchOrchestrator::new(
			embedder.clone(),
			index.clone(),
			source,
			SearchSettings::from(&cfg.search),
		);

		Self { cfg, db, embedder, index, orchestrator }
	}

	/// Connects to Postgres and, when configured, Qdrant, and makes sure both are bootstrapped.
	pub async fn connect(cfg: Config, providers: Providers) -> Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await?;

		db.ensure_schema().await?;

		let index: Arc<dyn VectorIndex> = match cfg.storage.qdrant.as_ref() {
			Some(qdrant_cfg) => {
				let store = QdrantStore::new(qdrant_cfg)?;

				store.ensure_collection().await?;

				Arc::new(QdrantVectorIndex::new(store))
			},
			None => {
				tracing::info!("Qdrant is not configured. Searches use the lexical path only.");

				Arc::new(DisabledVectorIndex)
			},
		};

		Ok(Self::with_providers(cfg, db, index, providers))
	}

	/// Runs a search, using `search.default_limit` when `limit` is omitted.
	pub async fn search(&self, query: &str, limit: Option<u32>) -> Result<SearchResponse> {
		self.orchestrator.search(query, limit.unwrap_or(self.cfg.search.default_limit)).await
	}
}
