use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use sift_service::{Error as ServiceError, SearchRequest, SearchResponse};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;

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
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		tracing::error!(error = %err, "Search failed on a fatal upstream error.");

		match err {
			ServiceError::Retrieval { message } => ApiError::new(
				StatusCode::BAD_GATEWAY,
				"UPSTREAM_FATAL",
				format!("Retrieval backend rejected the request: {message}"),
			),
			ServiceError::Metrics { message } => ApiError::new(
				StatusCode::BAD_GATEWAY,
				"UPSTREAM_FATAL",
				format!("Metrics backend rejected the request: {message}"),
			),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
