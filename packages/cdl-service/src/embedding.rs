use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{EmbeddingProvider, Error, Result};
use cdl_config::EmbeddingProviderConfig;
use cdl_domain::{similarity, text};

/// Owned handle to the embedding model.
///
/// Immutable after construction and shared across concurrent requests. At most
/// `max_concurrency` provider calls are in flight. Every returned vector has the configured
/// dimension and unit length (zero vectors are returned unchanged).
pub struct EmbeddingGenerator {
	cfg: EmbeddingProviderConfig,
	provider: Arc<dyn EmbeddingProvider>,
	permits: Semaphore,
	version: String,
}
impl EmbeddingGenerator {
	pub fn new(cfg: EmbeddingProviderConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
		let permits = Semaphore::new(cfg.max_concurrency.max(1) as usize);
		let version = format!("{}:{}:{}", cfg.provider_id, cfg.model, cfg.dimensions);

		Self { cfg, provider, permits, version }
	}

	pub fn dimensions(&self) -> usize {
		self.cfg.dimensions as usize
	}

	/// Tag stored next to every embedding, `<provider_id>:<model>:<dimensions>`.
	pub fn version(&self) -> &str {
		&self.version
	}

	pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embed_many(&[text.to_string()]).await?;

		vectors.pop().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}

	pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let inputs = texts.iter().map(|text| self.prepare(text)).collect::<Result<Vec<_>>>()?;

		if inputs.is_empty() {
			return Ok(Vec::new());
		}

		let vectors = {
			let _permit = self.permits.acquire().await.map_err(|_| Error::Internal {
				message: "Embedding generator has been shut down.".to_string(),
			})?;

			self.provider.embed(&self.cfg, &inputs).await?
		};

		if vectors.len() != inputs.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					inputs.len()
				),
			});
		}

		vectors
			.into_iter()
			.map(|mut vec| {
				if vec.len() != self.dimensions() {
					return Err(Error::Provider {
						message: "Embedding vector dimension mismatch.".to_string(),
					});
				}

				similarity::l2_normalize(&mut vec);

				Ok(vec)
			})
			.collect()
	}

	/// Closes the admission gate. Calls made afterwards fail instead of reaching the provider.
	pub fn shutdown(&self) {
		self.permits.close();
	}

	fn prepare(&self, text: &str) -> Result<String> {
		let trimmed = text.trim();

		if trimmed.is_empty() {
			return Err(Error::EmptyInput);
		}

		Ok(text::truncate_chars(trimmed, self.cfg.max_input_chars as usize).to_string())
	}
}
