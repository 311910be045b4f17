//! Bearer-token caller extractor and Basic-credentials parsing for login.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use beacon_core::{UserId, identity::IdentityProvider};

use crate::{AppState, Backend, error::ApiError};

/// The user behind a request, if its bearer token resolved to one.
///
/// A missing or unknown token is not rejected here; operations that need a
/// caller fail with `Unauthenticated` themselves.
pub struct Caller(pub Option<UserId>);

impl Caller {
  pub fn id(&self) -> Option<&UserId> { self.0.as_ref() }
}

/// The raw token from an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Decode `Authorization: Basic …` into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::InvalidCredentials)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::InvalidCredentials)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::InvalidCredentials)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::InvalidCredentials)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::InvalidCredentials)?;
  Ok((email.to_owned(), password.to_owned()))
}

impl<S: Backend> FromRequestParts<AppState<S>> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Some(token) = bearer_token(&parts.headers) else {
      return Ok(Caller(None));
    };
    let user_id = state
      .identity
      .resolve_session(token.to_owned())
      .await
      .map_err(ApiError::store)?;
    Ok(Caller(user_id))
  }
}
