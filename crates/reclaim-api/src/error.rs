//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request body was not the JSON the route expects.
  #[error("invalid body: {0}")]
  Body(#[from] JsonRejection),

  #[error("invalid query: {0}")]
  Query(#[from] QueryRejection),

  #[error("engine error: {0}")]
  Engine(#[from] reclaim_engine::Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use reclaim_engine::Error as EngineError;

    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Body(rejection) => (rejection.status(), rejection.body_text()),
      ApiError::Query(rejection) => (rejection.status(), rejection.body_text()),
      ApiError::Engine(EngineError::SequenceNotFound(id)) => {
        (StatusCode::NOT_FOUND, format!("sequence {id} not found"))
      }
      ApiError::Engine(EngineError::Stopped) => {
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
      }
      ApiError::Engine(EngineError::Core(reclaim_core::Error::PreconditionUnmet(m))) => {
        (StatusCode::UNPROCESSABLE_ENTITY, m.clone())
      }
      ApiError::Engine(e) => {
        tracing::warn!(error = %e, "engine request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
