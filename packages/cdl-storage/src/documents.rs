use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{Document, DocumentPatch, NewDocument},
};

const DOCUMENT_COLUMNS: &str = "\
doc_id,
	seq,
	title,
	content,
	authors,
	tags,
	file_path,
	metadata,
	content_hash,
	content_embedding,
	embedding_version,
	upload_date,
	updated_at";

pub async fn insert_document<'e, E>(executor: E, doc: &NewDocument) -> Result<Document>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO documents (
	doc_id,
	title,
	content,
	authors,
	tags,
	file_path,
	metadata,
	content_hash,
	content_embedding,
	embedding_version,
	upload_date,
	updated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
RETURNING {DOCUMENT_COLUMNS}"
	);
	let stored = sqlx::query_as::<_, Document>(&sql)
		.bind(doc.doc_id)
		.bind(doc.title.as_str())
		.bind(doc.content.as_str())
		.bind(&doc.authors)
		.bind(&doc.tags)
		.bind(doc.file_path.as_deref())
		.bind(&doc.metadata)
		.bind(doc.content_hash.as_str())
		.bind(doc.content_embedding.as_deref())
		.bind(doc.embedding_version.as_deref())
		.bind(doc.upload_date)
		.fetch_one(executor)
		.await?;

	Ok(stored)
}

pub async fn get_document<'e, E>(executor: E, doc_id: Uuid) -> Result<Option<Document>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {DOCUMENT_COLUMNS}\nFROM documents\nWHERE doc_id = $1");
	let doc = sqlx::query_as::<_, Document>(&sql).bind(doc_id).fetch_optional(executor).await?;

	Ok(doc)
}

/// Loads the given documents. Ids with no stored row are skipped; order is unspecified.
pub async fn get_documents_by_ids<'e, E>(executor: E, doc_ids: &[Uuid]) -> Result<Vec<Document>>
where
	E: PgExecutor<'e>,
{
	if doc_ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!("SELECT {DOCUMENT_COLUMNS}\nFROM documents\nWHERE doc_id = ANY($1)");
	let docs = sqlx::query_as::<_, Document>(&sql).bind(doc_ids).fetch_all(executor).await?;

	Ok(docs)
}

/// Newest first. An empty `tags` slice disables the tag filter; otherwise a document matches when
/// it carries any of the given tags.
pub async fn list_documents<'e, E>(
	executor: E,
	skip: i64,
	limit: i64,
	tags: &[String],
) -> Result<Vec<Document>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {DOCUMENT_COLUMNS}
FROM documents
WHERE cardinality($3::text[]) = 0 OR tags && $3::text[]
ORDER BY upload_date DESC, seq DESC
OFFSET $1
LIMIT $2"
	);
	let docs = sqlx::query_as::<_, Document>(&sql)
		.bind(skip)
		.bind(limit)
		.bind(tags)
		.fetch_all(executor)
		.await?;

	Ok(docs)
}

/// Keyset page over every document in insertion order, starting after `after_seq`.
pub async fn list_documents_after<'e, E>(
	executor: E,
	after_seq: i64,
	batch_size: i64,
) -> Result<Vec<Document>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {DOCUMENT_COLUMNS}
FROM documents
WHERE seq > $1
ORDER BY seq
LIMIT $2"
	);
	let docs = sqlx::query_as::<_, Document>(&sql)
		.bind(after_seq)
		.bind(batch_size)
		.fetch_all(executor)
		.await?;

	Ok(docs)
}

pub async fn count_documents<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 =
		sqlx::query_scalar("SELECT count(*) FROM documents").fetch_one(executor).await?;

	Ok(count)
}

/// Case-insensitive substring match of `term` against title, content, any tag, or any author.
/// `term` is matched literally. Results follow insertion order.
pub async fn find_lexical<'e, E>(executor: E, term: &str, limit: i64) -> Result<Vec<Document>>
where
	E: PgExecutor<'e>,
{
	let pattern = format!("%{}%", escape_like(term));
	let sql = format!(
		"\
SELECT {DOCUMENT_COLUMNS}
FROM documents
WHERE title ILIKE $1 ESCAPE '\\'
	OR content ILIKE $1 ESCAPE '\\'
	OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1 ESCAPE '\\')
	OR EXISTS (SELECT 1 FROM unnest(authors) AS author WHERE author ILIKE $1 ESCAPE '\\')
ORDER BY seq
LIMIT $2"
	);
	let docs = sqlx::query_as::<_, Document>(&sql)
		.bind(pattern)
		.bind(limit)
		.fetch_all(executor)
		.await?;

	Ok(docs)
}

/// Applies `patch` column by column. Returns `None` when the row no longer exists.
pub async fn update_document<'e, E>(
	executor: E,
	doc_id: Uuid,
	patch: &DocumentPatch,
) -> Result<Option<Document>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE documents
SET
	title = COALESCE($2, title),
	authors = COALESCE($3::text[], authors),
	tags = COALESCE($4::text[], tags),
	metadata = COALESCE($5::jsonb, metadata),
	content = COALESCE($6, content),
	content_hash = COALESCE($7, content_hash),
	content_embedding = COALESCE($8::real[], content_embedding),
	embedding_version = COALESCE($9, embedding_version),
	updated_at = $10
WHERE doc_id = $1
RETURNING {DOCUMENT_COLUMNS}"
	);
	let content = patch.content.as_ref();
	let stored = sqlx::query_as::<_, Document>(&sql)
		.bind(doc_id)
		.bind(patch.title.as_deref())
		.bind(patch.authors.as_deref())
		.bind(patch.tags.as_deref())
		.bind(patch.metadata.as_ref())
		.bind(content.map(|update| update.content.as_str()))
		.bind(content.map(|update| update.content_hash.as_str()))
		.bind(content.map(|update| update.content_embedding.as_slice()))
		.bind(content.map(|update| update.embedding_version.as_str()))
		.bind(patch.updated_at)
		.fetch_optional(executor)
		.await?;

	Ok(stored)
}

/// Stores a regenerated embedding, but only while the row still holds the content it was
/// computed from. Returns `false` when the row is gone or its content changed meanwhile.
pub async fn set_embedding<'e, E>(
	executor: E,
	doc_id: Uuid,
	expected_content_hash: &str,
	embedding: &[f32],
	embedding_version: &str,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE documents
SET content_embedding = $3, embedding_version = $4, updated_at = $5
WHERE doc_id = $1 AND content_hash = $2",
	)
	.bind(doc_id)
	.bind(expected_content_hash)
	.bind(embedding)
	.bind(embedding_version)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Removes the row and returns it so callers can clean up derived state.
pub async fn delete_document<'e, E>(executor: E, doc_id: Uuid) -> Result<Option<Document>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("DELETE FROM documents\nWHERE doc_id = $1\nRETURNING {DOCUMENT_COLUMNS}");
	let doc = sqlx::query_as::<_, Document>(&sql).bind(doc_id).fetch_optional(executor).await?;

	Ok(doc)
}

/// Escapes `\`, `%` and `_` so the term matches literally under `LIKE ... ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
	let mut out = String::with_capacity(term.len());

	for ch in term.chars() {
		if matches!(ch, '\\' | '%' | '_') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
