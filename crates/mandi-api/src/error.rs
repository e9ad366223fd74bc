//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use mandi_core::role::RequiredField;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("incomplete signup: {message}")]
  Incomplete {
    message: String,
    missing: Vec<RequiredField>,
  },

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("storage unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<mandi_core::Error> for ApiError {
  fn from(e: mandi_core::Error) -> Self {
    use mandi_core::Error as E;
    match e {
      E::ParticipantNotFound(_) | E::FragmentNotFound { .. } => {
        Self::NotFound(e.to_string())
      }
      E::EmailConflict(_) => Self::Conflict(e.to_string()),
      E::IncompleteSignup { ref missing, .. } => Self::Incomplete {
        missing: missing.clone(),
        message: e.to_string(),
      },
      E::Validation(m) => Self::BadRequest(m),
      E::StorageUnavailable(inner) => Self::Unavailable(inner),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Incomplete { message, missing } => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": message, "missing": missing }),
      ),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Unavailable(e) => {
        tracing::error!(error = %e, "storage unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
