//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cram_core::generate::GenerationError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing user identity")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("content moderation refused the input: {0}")]
  ContentRefused(String),

  #[error("study material generation failed: {0}")]
  Generation(#[source] GenerationError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<GenerationError> for ApiError {
  fn from(e: GenerationError) -> Self {
    match e {
      GenerationError::Refused(reason) => Self::ContentRefused(reason),
      other => Self::Generation(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::ContentRefused(reason) => {
        tracing::warn!(%reason, "generation refused by moderation");
        (
          StatusCode::UNPROCESSABLE_ENTITY,
          "the text could not be processed due to safety policies; please revise it"
            .to_owned(),
        )
      }
      ApiError::Generation(e) => {
        tracing::error!(error = %e, "generation error");
        (StatusCode::BAD_GATEWAY, self.to_string())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
