mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Files, Postgres, Providers, Qdrant, Search, Service, Storage,
};

use std::{fs, path::Path};

/// Hard ceiling for the number of results a single search may request.
pub const MAX_SEARCH_LIMIT: u32 = 50;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("service.log_level", &cfg.service.log_level),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let embedding = &cfg.providers.embedding;

	if embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if embedding.max_input_chars == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.max_input_chars must be greater than zero.".to_string(),
		});
	}
	if embedding.max_concurrency == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.max_concurrency must be greater than zero.".to_string(),
		});
	}

	if let Some(qdrant) = cfg.storage.qdrant.as_ref() {
		if qdrant.url.trim().is_empty() || qdrant.collection.trim().is_empty() {
			return Err(Error::Validation {
				message: "storage.qdrant.url and storage.qdrant.collection must be non-empty."
					.to_string(),
			});
		}
		if embedding.dimensions != qdrant.vector_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
					.to_string(),
			});
		}
	}

	let search = &cfg.search;

	if !(1..=MAX_SEARCH_LIMIT).contains(&search.default_limit) {
		return Err(Error::Validation {
			message: format!("search.default_limit must be in the range 1-{MAX_SEARCH_LIMIT}."),
		});
	}
	if search.vector_pool_factor == 0 {
		return Err(Error::Validation {
			message: "search.vector_pool_factor must be greater than zero.".to_string(),
		});
	}
	if search.lexical_pool_factor == 0 {
		return Err(Error::Validation {
			message: "search.lexical_pool_factor must be greater than zero.".to_string(),
		});
	}
	if search.excerpt_chars == 0 {
		return Err(Error::Validation {
			message: "search.excerpt_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.files.upload_dir.trim().is_empty() {
		cfg.storage.files = Default::default();
	}

	cfg.service.cors_allowed_origins.retain(|origin| !origin.trim().is_empty());
}
