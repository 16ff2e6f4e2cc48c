use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		DeletePointsBuilder, PointId, PointStruct, PointsIdsList, Query, QueryPointsBuilder,
		SearchParamsBuilder, UpsertPointsBuilder, Vector, point_id::PointIdOptions,
	},
};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, Result,
	search::{VectorHit, VectorIndex, VectorOutcome},
};
use cdl_domain::similarity;
use cdl_storage::qdrant::{DENSE_VECTOR_NAME, QdrantStore};

/// Qdrant-backed index. The collection uses cosine distance, so raw scores in `[-1, 1]` are mapped
/// onto `[0, 1]` here and passed through untouched by the caller.
pub struct QdrantVectorIndex {
	store: QdrantStore,
}
impl QdrantVectorIndex {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}

	async fn run_query(&self, vector: &[f32], limit: u32, candidate_pool: u32) -> VectorOutcome {
		let search = QueryPointsBuilder::new(self.store.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(DENSE_VECTOR_NAME)
			.params(SearchParamsBuilder::default().hnsw_ef(u64::from(candidate_pool)))
			.limit(u64::from(limit));
		let response = match self.store.client.query(search).await {
			Ok(response) => response,
			Err(err) => return VectorOutcome::Failed { message: err.to_string() },
		};
		let hits = response
			.result
			.into_iter()
			.filter_map(|point| {
				let doc_id = point.id.as_ref().and_then(point_id_to_uuid)?;

				Some(VectorHit { doc_id, score: similarity::unit_interval(point.score) })
			})
			.collect::<Vec<_>>();

		if hits.is_empty() { VectorOutcome::Empty } else { VectorOutcome::Matches(hits) }
	}

	async fn upsert_point(&self, doc_id: Uuid, vector: &[f32]) -> Result<()> {
		let mut payload = Payload::new();

		payload.insert("doc_id", doc_id.to_string());

		let mut vectors = HashMap::new();

		vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector.to_vec()));

		let point = PointStruct::new(doc_id.to_string(), vectors, payload);

		self.store
			.client
			.upsert_points(
				UpsertPointsBuilder::new(self.store.collection.clone(), vec![point]).wait(true),
			)
			.await
			.map_err(|err| Error::Qdrant { message: err.to_string() })?;

		Ok(())
	}

	async fn delete_point(&self, doc_id: Uuid) -> Result<()> {
		let ids: Vec<PointId> = vec![doc_id.to_string().into()];

		self.store
			.client
			.delete_points(
				DeletePointsBuilder::new(self.store.collection.clone())
					.points(PointsIdsList { ids })
					.wait(true),
			)
			.await
			.map_err(|err| Error::Qdrant { message: err.to_string() })?;

		Ok(())
	}
}

impl VectorIndex for QdrantVectorIndex {
	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		candidate_pool: u32,
	) -> BoxFuture<'a, VectorOutcome> {
		Box::pin(self.run_query(vector, limit, candidate_pool))
	}

	fn upsert<'a>(&'a self, doc_id: Uuid, vector: &'a [f32]) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert_point(doc_id, vector))
	}

	fn remove<'a>(&'a self, doc_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.delete_point(doc_id))
	}
}

/// Stand-in used when no engine is configured. Queries report `Unavailable`; writes are no-ops.
pub struct DisabledVectorIndex;
impl VectorIndex for DisabledVectorIndex {
	fn query<'a>(&'a self, _: &'a [f32], _: u32, _: u32) -> BoxFuture<'a, VectorOutcome> {
		Box::pin(async { VectorOutcome::Unavailable })
	}

	fn upsert<'a>(&'a self, _: Uuid, _: &'a [f32]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, _: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}

	fn is_enabled(&self) -> bool {
		false
	}
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}
