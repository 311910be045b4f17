//! API error type and [`axum::response::IntoResponse`] implementation.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use beacon_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// Bad or missing login credentials.
  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Box any backend error into [`ApiError::Store`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

/// `location_details` → `locationDetails`, matching the JSON field names.
fn camel_case(field: &str) -> String {
  let mut out = String::with_capacity(field.len());
  let mut upper = false;
  for c in field.chars() {
    if c == '_' {
      upper = true;
    } else if upper {
      out.extend(c.to_uppercase());
      upper = false;
    } else {
      out.push(c);
    }
  }
  out
}

/// Per-field messages, keyed by JSON field name.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
  errors
    .field_errors()
    .into_iter()
    .map(|(field, errs)| {
      let messages = errs
        .iter()
        .map(|e| {
          e.message
            .as_ref()
            .map_or_else(|| e.code.to_string(), |m| m.to_string())
        })
        .collect();
      (camel_case(&field), messages)
    })
    .collect()
}

fn core_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
    CoreError::ProfileRequired(_) => StatusCode::PRECONDITION_FAILED,
    CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
    CoreError::InvalidTransition(_)
    | CoreError::UnknownIncidentType(_)
    | CoreError::UnknownStatus(_)
    | CoreError::UnknownUserType(_) => StatusCode::BAD_REQUEST,
    CoreError::ProfileExists(_) => StatusCode::CONFLICT,
    CoreError::ReportNotFound(_) => StatusCode::NOT_FOUND,
    CoreError::WriteAborted | CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Core(CoreError::Validation(errors)) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "validation failed", "fields": field_messages(errors) }),
      ),
      ApiError::Core(e) => (core_status(e), json!({ "error": e.to_string() })),
      ApiError::InvalidCredentials => {
        (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };

    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"beacon\""));
    }
    res
  }
}
