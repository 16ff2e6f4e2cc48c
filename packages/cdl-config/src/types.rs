use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
	/// Browser origins allowed to call the HTTP API. Empty disables CORS headers.
	#[serde(default)]
	pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	/// Optional. Without it the native similarity path reports itself unavailable and every
	/// search is served by the lexical fallback.
	pub qdrant: Option<Qdrant>,
	#[serde(default)]
	pub files: Files,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Files {
	pub upload_dir: String,
}
impl Default for Files {
	fn default() -> Self {
		Self { upload_dir: default_upload_dir() }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Inputs longer than this many characters are cut to their prefix before encoding.
	#[serde(default = "default_max_input_chars")]
	pub max_input_chars: u32,
	/// Upper bound on embedding calls in flight across all requests.
	#[serde(default = "default_max_concurrency")]
	pub max_concurrency: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub vector_pool_factor: u32,
	pub lexical_pool_factor: u32,
	pub excerpt_chars: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: 10,
			vector_pool_factor: 10,
			lexical_pool_factor: 2,
			excerpt_chars: 500,
		}
	}
}

fn default_upload_dir() -> String {
	"uploads".to_string()
}

fn default_max_input_chars() -> u32 {
	5_000
}

fn default_max_concurrency() -> u32 {
	4
}
