use sqlx::PgPool;
use uuid::Uuid;

use crate::{BoxFuture, Result, search::DocumentSource};
use cdl_storage::{documents, models::Document};

/// Postgres-backed lexical matcher and hydration source.
pub struct PgDocumentSource {
	pool: PgPool,
}
impl PgDocumentSource {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

impl DocumentSource for PgDocumentSource {
	fn find_lexical<'a>(
		&'a self,
		term: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(async move {
			Ok(documents::find_lexical(&self.pool, term, i64::from(limit)).await?)
		})
	}

	fn fetch_by_ids<'a>(&'a self, doc_ids: &'a [Uuid]) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(async move { Ok(documents::get_documents_by_ids(&self.pool, doc_ids).await?) })
	}
}
