use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CdlService, Error, Result, documents::indexable_embedding};
use cdl_storage::{documents, models::Document};

const BATCH_SIZE: i64 = 128;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildReport {
	pub rebuilt_count: u64,
	pub missing_vector_count: u64,
	pub error_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReembedReport {
	pub reembedded_count: u64,
	pub error_count: u64,
}

impl CdlService {
	/// Re-upserts every stored embedding of the configured dimension into the native index.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		if !self.index.is_enabled() {
			return Err(Error::Validation {
				message: "No vector index is configured.".to_string(),
			});
		}

		let dimensions = self.embedder.dimensions();
		let mut report =
			RebuildReport { rebuilt_count: 0, missing_vector_count: 0, error_count: 0 };
		let mut after_seq = 0_i64;

		loop {
			let batch =
				documents::list_documents_after(&self.db.pool, after_seq, BATCH_SIZE).await?;
			let Some(last) = batch.last() else {
				break;
			};

			after_seq = last.seq;

			for doc in &batch {
				let Some(vector) = indexable_embedding(doc, dimensions) else {
					report.missing_vector_count += 1;

					continue;
				};

				match self.index.upsert(doc.doc_id, vector).await {
					Ok(()) => report.rebuilt_count += 1,
					Err(err) => {
						tracing::warn!(
							doc_id = %doc.doc_id,
							error = %err,
							"Failed to rebuild index point."
						);

						report.error_count += 1;
					},
				}
			}
		}

		tracing::info!(
			rebuilt_count = report.rebuilt_count,
			missing_vector_count = report.missing_vector_count,
			error_count = report.error_count,
			"Vector index rebuild finished."
		);

		Ok(report)
	}

	/// Regenerates embeddings that are missing, of the wrong dimension, or produced by another
	/// model configuration, and re-indexes the affected documents.
	pub async fn reembed_documents(&self) -> Result<ReembedReport> {
		let mut report = ReembedReport { reembedded_count: 0, error_count: 0 };
		let mut after_seq = 0_i64;

		loop {
			let batch =
				documents::list_documents_after(&self.db.pool, after_seq, BATCH_SIZE).await?;
			let Some(last) = batch.last() else {
				break;
			};

			after_seq = last.seq;

			for doc in batch.into_iter().filter(|doc| self.needs_reembed(doc)) {
				let doc_id = doc.doc_id;

				match self.reembed_one(doc).await {
					Ok(true) => report.reembedded_count += 1,
					Ok(false) => tracing::debug!(
						doc_id = %doc_id,
						"Document changed during re-embedding. Skipped."
					),
					Err(err) => {
						tracing::warn!(error = %err, "Failed to re-embed document.");

						report.error_count += 1;
					},
				}
			}
		}

		tracing::info!(
			reembedded_count = report.reembedded_count,
			error_count = report.error_count,
			"Re-embedding finished."
		);

		Ok(report)
	}

	fn needs_reembed(&self, doc: &Document) -> bool {
		indexable_embedding(doc, self.embedder.dimensions()).is_none()
			|| doc.embedding_version.as_deref() != Some(self.embedder.version())
	}

	/// Returns `false` when the row was deleted or its content changed after `doc` was read. The
	/// newer write already carries a matching embedding, so nothing is stored or indexed.
	pub(crate) async fn reembed_one(&self, mut doc: Document) -> Result<bool> {
		let vector = self.embedder.embed(&doc.content).await?;
		let now = OffsetDateTime::now_utc();
		let updated = documents::set_embedding(
			&self.db.pool,
			doc.doc_id,
			&doc.content_hash,
			&vector,
			self.embedder.version(),
			now,
		)
		.await?;

		if !updated {
			return Ok(false);
		}

		doc.content_embedding = Some(vector);
		doc.embedding_version = Some(self.embedder.version().to_string());

		self.sync_index(&doc).await;

		Ok(true)
	}
}
