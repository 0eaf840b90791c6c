//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use roster_core::{
  BookingError, assignment::ResourceAssignment, eligibility::Mismatch,
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

  #[error("{0}")]
  InvalidTransition(String),

  #[error("{0}")]
  AlreadyExists(String),

  /// Lost a booking race. `visible` is the caller's refreshed dashboard when
  /// the caller is a known candidate.
  #[error("{message}")]
  Conflict {
    message: String,
    visible: Option<Vec<ResourceAssignment>>,
  },

  #[error("candidate is not eligible: {0}")]
  Ineligible(Mismatch),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::NotFound(_) => "not_found",
      Self::BadRequest(_) => "bad_request",
      Self::InvalidTransition(_) => "invalid_transition",
      Self::AlreadyExists(_) => "already_exists",
      Self::Conflict { .. } => "conflict",
      Self::Ineligible(_) => "ineligible",
      Self::Store(_) => "store",
    }
  }
}

impl From<BookingError> for ApiError {
  fn from(e: BookingError) -> Self {
    match e {
      BookingError::NotFound(..) => Self::NotFound(e.to_string()),
      BookingError::InvalidTransition { .. } => Self::InvalidTransition(e.to_string()),
      BookingError::AlreadyExists(..) => Self::AlreadyExists(e.to_string()),
      BookingError::Conflict => Self::Conflict { message: e.to_string(), visible: None },
      BookingError::Ineligible(mismatch) => Self::Ineligible(mismatch),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let code = self.code();
    let message = self.to_string();
    match self {
      ApiError::NotFound(_) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": message, "code": code })))
          .into_response()
      }
      ApiError::BadRequest(_) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": message, "code": code })))
          .into_response()
      }
      ApiError::InvalidTransition(_) | ApiError::AlreadyExists(_) => {
        (StatusCode::CONFLICT, Json(json!({ "error": message, "code": code })))
          .into_response()
      }
      ApiError::Conflict { visible, .. } => (
        StatusCode::CONFLICT,
        Json(json!({
          "error": message,
          "code": code,
          "hint": "re-query visible assignments",
          "visible": visible,
        })),
      )
        .into_response(),
      ApiError::Ineligible(mismatch) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message, "code": code, "mismatch": mismatch })),
      )
        .into_response(),
      ApiError::Store(e) => {
        tracing::error!("store failure: {e}");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": message, "code": code })),
        )
          .into_response()
      }
    }
  }
}
