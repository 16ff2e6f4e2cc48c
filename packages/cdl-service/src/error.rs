pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Input text must be non-empty.")]
	EmptyInput,
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<cdl_storage::Error> for Error {
	fn from(err: cdl_storage::Error) -> Self {
		match err {
			cdl_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			cdl_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<cdl_providers::Error> for Error {
	fn from(err: cdl_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
