use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Document {
	pub doc_id: Uuid,
	/// Insertion order. Lexical candidates are returned in this order.
	pub seq: i64,
	pub title: String,
	pub content: String,
	pub authors: Vec<String>,
	pub tags: Vec<String>,
	pub file_path: Option<String>,
	pub metadata: Value,
	pub content_hash: String,
	pub content_embedding: Option<Vec<f32>>,
	pub embedding_version: Option<String>,
	pub upload_date: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Column values for a document that has not been stored yet. `seq` is assigned by Postgres.
#[derive(Debug, Clone)]
pub struct NewDocument {
	pub doc_id: Uuid,
	pub title: String,
	pub content: String,
	pub authors: Vec<String>,
	pub tags: Vec<String>,
	pub file_path: Option<String>,
	pub metadata: Value,
	pub content_hash: String,
	pub content_embedding: Option<Vec<f32>>,
	pub embedding_version: Option<String>,
	pub upload_date: OffsetDateTime,
}

/// Column-wise update. `None` leaves the stored column untouched, so concurrent patches of
/// different fields do not overwrite each other.
#[derive(Debug, Clone)]
pub struct DocumentPatch {
	pub title: Option<String>,
	pub authors: Option<Vec<String>>,
	pub tags: Option<Vec<String>>,
	pub metadata: Option<Value>,
	pub content: Option<ContentUpdate>,
	pub updated_at: OffsetDateTime,
}

/// New content together with the embedding computed from it. Written as one unit.
#[derive(Debug, Clone)]
pub struct ContentUpdate {
	pub content: String,
	pub content_hash: String,
	pub content_embedding: Vec<f32>,
	pub embedding_version: String,
}
