use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CdlService, Error, Result};
use cdl_domain::text;
use cdl_storage::{
	documents,
	models::{ContentUpdate, Document, DocumentPatch, NewDocument},
};

pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
	pub title: String,
	pub content: String,
	#[serde(default)]
	pub authors: Vec<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub metadata: Option<Value>,
	/// Location of the original upload, relative to `storage.files.upload_dir`.
	#[serde(default)]
	pub file_path: Option<String>,
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRequest {
	pub title: Option<String>,
	pub content: Option<String>,
	pub authors: Option<Vec<String>>,
	pub tags: Option<Vec<String>>,
	pub metadata: Option<Value>,
}
impl UpdateDocumentRequest {
	fn is_empty(&self) -> bool {
		self.title.is_none()
			&& self.content.is_none()
			&& self.authors.is_none()
			&& self.tags.is_none()
			&& self.metadata.is_none()
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDocumentsRequest {
	#[serde(default)]
	pub skip: u32,
	#[serde(default = "default_list_limit")]
	pub limit: u32,
	/// Any-of filter; empty means no filter.
	#[serde(default)]
	pub tags: Vec<String>,
}
impl Default for ListDocumentsRequest {
	fn default() -> Self {
		Self { skip: 0, limit: default_list_limit(), tags: Vec::new() }
	}
}

/// Stored document as exposed to clients. The embedding itself is not serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub authors: Vec<String>,
	pub tags: Vec<String>,
	pub file_path: Option<String>,
	pub metadata: Value,
	#[serde(with = "crate::time_serde")]
	pub upload_date: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub has_embedding: bool,
	pub embedding_version: Option<String>,
}
impl From<Document> for DocumentView {
	fn from(doc: Document) -> Self {
		Self {
			id: doc.doc_id,
			title: doc.title,
			content: doc.content,
			authors: doc.authors,
			tags: doc.tags,
			file_path: doc.file_path,
			metadata: doc.metadata,
			upload_date: doc.upload_date,
			updated_at: doc.updated_at,
			has_embedding: doc.content_embedding.is_some(),
			embedding_version: doc.embedding_version,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCount {
	pub total_documents: i64,
}

impl CdlService {
	/// Stores a document with its content embedding and indexes it when an engine is configured.
	///
	/// Embedding failures fail the write. Index failures are logged and left for
	/// `rebuild_index` to repair.
	pub async fn create_document(&self, req: CreateDocumentRequest) -> Result<DocumentView> {
		let title = required_field("title", &req.title)?;
		let content = required_field("content", &req.content)?;
		let metadata = normalize_metadata(req.metadata)?;
		let file_path = req.file_path.as_deref().map(validate_file_path).transpose()?;
		let embedding = self.embedder.embed(&content).await?;
		let now = OffsetDateTime::now_utc();
		let new_doc = NewDocument {
			doc_id: Uuid::new_v4(),
			title,
			content_hash: content_hash(&content),
			content,
			authors: text::clean_names(&req.authors),
			tags: text::clean_list(&req.tags),
			file_path,
			metadata,
			content_embedding: Some(embedding),
			embedding_version: Some(self.embedder.version().to_string()),
			upload_date: now,
		};
		let stored = documents::insert_document(&self.db.pool, &new_doc).await?;

		self.sync_index(&stored).await;

		tracing::info!(doc_id = %stored.doc_id, "Document created.");

		Ok(stored.into())
	}

	pub async fn get_document(&self, doc_id: Uuid) -> Result<DocumentView> {
		documents::get_document(&self.db.pool, doc_id)
			.await?
			.map(DocumentView::from)
			.ok_or_else(|| not_found(doc_id))
	}

	/// Newest first.
	pub async fn list_documents(&self, req: ListDocumentsRequest) -> Result<Vec<DocumentView>> {
		if !(1..=MAX_LIST_LIMIT).contains(&req.limit) {
			return Err(Error::Validation {
				message: format!("limit must be in the range 1-{MAX_LIST_LIMIT}."),
			});
		}

		let tags = text::clean_list(&req.tags);
		let docs = documents::list_documents(
			&self.db.pool,
			i64::from(req.skip),
			i64::from(req.limit),
			&tags,
		)
		.await?;

		Ok(docs.into_iter().map(DocumentView::from).collect())
	}

	pub async fn count_documents(&self) -> Result<DocumentCount> {
		let total_documents = documents::count_documents(&self.db.pool).await?;

		Ok(DocumentCount { total_documents })
	}

	/// Applies a partial update. The embedding is regenerated only when the content changes.
	pub async fn update_document(
		&self,
		doc_id: Uuid,
		req: UpdateDocumentRequest,
	) -> Result<DocumentView> {
		if req.is_empty() {
			return Err(Error::Validation { message: "No fields to update.".to_string() });
		}

		let current = documents::get_document(&self.db.pool, doc_id)
			.await?
			.ok_or_else(|| not_found(doc_id))?;
		let title = req.title.as_deref().map(|title| required_field("title", title)).transpose()?;
		let metadata = match req.metadata {
			Some(metadata) => Some(normalize_metadata(Some(metadata))?),
			None => None,
		};
		let content = match req.content.as_deref() {
			Some(content) => {
				let content = required_field("content", content)?;
				let content_hash = content_hash(&content);

				if content_hash == current.content_hash {
					None
				} else {
					let content_embedding = self.embedder.embed(&content).await?;

					Some(ContentUpdate {
						content,
						content_hash,
						content_embedding,
						embedding_version: self.embedder.version().to_string(),
					})
				}
			},
			None => None,
		};
		let reembedded = content.is_some();
		let patch = DocumentPatch {
			title,
			authors: req.authors.as_ref().map(text::clean_names),
			tags: req.tags.as_ref().map(text::clean_list),
			metadata,
			content,
			updated_at: OffsetDateTime::now_utc(),
		};
		let stored = documents::update_document(&self.db.pool, doc_id, &patch)
			.await?
			.ok_or_else(|| not_found(doc_id))?;

		if reembedded {
			self.sync_index(&stored).await;
		}

		tracing::info!(doc_id = %doc_id, reembedded, "Document updated.");

		Ok(stored.into())
	}

	/// Deletes the row, its index point and, best effort, the uploaded file.
	pub async fn delete_document(&self, doc_id: Uuid) -> Result<()> {
		let doc = documents::delete_document(&self.db.pool, doc_id)
			.await?
			.ok_or_else(|| not_found(doc_id))?;

		if let Err(err) = self.index.remove(doc_id).await {
			tracing::warn!(
				doc_id = %doc_id,
				error = %err,
				"Failed to remove document from index."
			);
		}
		if let Some(file_path) = doc.file_path.as_deref() {
			let path = Path::new(&self.cfg.storage.files.upload_dir).join(file_path);

			if let Err(err) = tokio::fs::remove_file(&path).await
				&& err.kind() != std::io::ErrorKind::NotFound
			{
				tracing::warn!(
					path = %path.display(),
					error = %err,
					"Failed to remove uploaded file."
				);
			}
		}

		tracing::info!(doc_id = %doc_id, "Document deleted.");

		Ok(())
	}

	pub(crate) async fn sync_index(&self, doc: &Document) {
		let Some(vector) = indexable_embedding(doc, self.embedder.dimensions()) else {
			return;
		};

		if let Err(err) = self.index.upsert(doc.doc_id, vector).await {
			tracing::warn!(doc_id = %doc.doc_id, error = %err, "Failed to index document.");
		}
	}
}

/// The stored embedding when it has the configured dimension. Anything else must stay out of the
/// native index.
pub(crate) fn indexable_embedding(doc: &Document, dimensions: usize) -> Option<&[f32]> {
	doc.content_embedding.as_deref().filter(|vec| vec.len() == dimensions)
}

pub(crate) fn content_hash(content: &str) -> String {
	blake3::hash(content.as_bytes()).to_hex().to_string()
}

fn required_field(name: &str, value: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::Validation { message: format!("{name} must be non-empty.") });
	}
	if trimmed.contains('\0') {
		return Err(Error::Validation {
			message: format!("{name} must not contain NUL characters."),
		});
	}

	Ok(trimmed.to_string())
}

fn normalize_metadata(metadata: Option<Value>) -> Result<Value> {
	match metadata {
		None | Some(Value::Null) => Ok(Value::Object(Default::default())),
		Some(value @ Value::Object(_)) => Ok(value),
		Some(_) =>
			Err(Error::Validation { message: "metadata must be a JSON object.".to_string() }),
	}
}

fn validate_file_path(raw: &str) -> Result<String> {
	let path = PathBuf::from(raw.trim());
	let is_relative = !raw.trim().is_empty()
		&& path.components().all(|component| matches!(component, Component::Normal(_)));

	if !is_relative {
		return Err(Error::Validation {
			message: "file_path must be a relative path inside the upload directory.".to_string(),
		});
	}

	Ok(raw.trim().to_string())
}

fn not_found(doc_id: Uuid) -> Error {
	Error::NotFound { message: format!("Document {doc_id} not found.") }
}

fn default_list_limit() -> u32 {
	50
}
