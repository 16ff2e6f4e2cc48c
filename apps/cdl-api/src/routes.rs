use axum::{
	Json, Router,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use cdl_domain::text;
use cdl_service::{
	CreateDocumentRequest, DocumentCount, DocumentView, Error as ServiceError,
	ListDocumentsRequest, RebuildReport, ReembedReport, SearchResponse, UpdateDocumentRequest,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
	#[serde(default)]
	pub q: String,
	pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
	pub skip: Option<u32>,
	pub limit: Option<u32>,
	/// Comma-separated tag list.
	pub tags: Option<String>,
}
impl From<ListParams> for ListDocumentsRequest {
	fn from(params: ListParams) -> Self {
		let defaults = ListDocumentsRequest::default();

		Self {
			skip: params.skip.unwrap_or(defaults.skip),
			limit: params.limit.unwrap_or(defaults.limit),
			tags: params.tags.as_deref().map(text::parse_list).unwrap_or_default(),
		}
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/search", get(search))
		.route("/documents", post(create_document).get(list_documents))
		.route("/documents/count", get(count_documents))
		.route(
			"/documents/{id}",
			get(get_document).put(update_document).delete(delete_document),
		)
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/reindex", post(rebuild_index))
		.route("/v1/admin/reembed", post(reembed_documents))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Query(params) = params?;
	let response = state.service.search(&params.q, params.limit).await?;

	Ok(Json(response))
}

async fn create_document(
	State(state): State<AppState>,
	payload: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentView>), ApiError> {
	let Json(payload) = payload?;
	let response = state.service.create_document(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn list_documents(
	State(state): State<AppState>,
	params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<DocumentView>>, ApiError> {
	let Query(params) = params?;
	let response = state.service.list_documents(params.into()).await?;

	Ok(Json(response))
}

async fn count_documents(State(state): State<AppState>) -> Result<Json<DocumentCount>, ApiError> {
	let response = state.service.count_documents().await?;

	Ok(Json(response))
}

async fn get_document(
	State(state): State<AppState>,
	id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DocumentView>, ApiError> {
	let Path(id) = id?;
	let response = state.service.get_document(id).await?;

	Ok(Json(response))
}

async fn update_document(
	State(state): State<AppState>,
	id: Result<Path<Uuid>, PathRejection>,
	payload: Result<Json<UpdateDocumentRequest>, JsonRejection>,
) -> Result<Json<DocumentView>, ApiError> {
	let Path(id) = id?;
	let Json(payload) = payload?;
	let response = state.service.update_document(id, payload).await?;

	Ok(Json(response))
}

async fn delete_document(
	State(state): State<AppState>,
	id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
	let Path(id) = id?;

	state.service.delete_document(id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn rebuild_index(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let response = state.service.rebuild_index().await?;

	Ok(Json(response))
}

async fn reembed_documents(
	State(state): State<AppState>,
) -> Result<Json<ReembedReport>, ApiError> {
	let response = state.service.reembed_documents().await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}

	fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::Validation { .. } => Self::invalid_request(err.to_string()),
			ServiceError::EmptyInput =>
				Self::new(StatusCode::BAD_REQUEST, "EMPTY_INPUT", err.to_string()),
			ServiceError::NotFound { .. } =>
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
			ServiceError::Provider { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", err.to_string()),
			ServiceError::Storage { .. } | ServiceError::Qdrant { .. } => {
				tracing::error!(error = %err, "Storage failure while serving a request.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string())
			},
			ServiceError::Internal { .. } => {
				tracing::error!(error = %err, "Internal failure while serving a request.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", err.to_string())
			},
		}
	}
}

impl From<QueryRejection> for ApiError {
	fn from(err: QueryRejection) -> Self {
		Self::invalid_request(err.body_text())
	}
}

impl From<JsonRejection> for ApiError {
	fn from(err: JsonRejection) -> Self {
		Self::invalid_request(err.body_text())
	}
}

impl From<PathRejection> for ApiError {
	fn from(_: PathRejection) -> Self {
		Self::invalid_request("Malformed document id.")
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
