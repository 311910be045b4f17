//! Handlers for registration, sessions and the caller's own profile.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/auth/register` | Body: [`Registration`]; 201 + profile |
//! | `POST`  | `/auth/login` | Basic credentials; returns a bearer token |
//! | `POST`  | `/auth/logout` | Revokes the bearer token; 204 |
//! | `GET`   | `/me` | Profile plus `setupRequired` |
//! | `PATCH` | `/me/profile` | Body: [`ProfileUpdate`]; 202 |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use beacon_core::{
  Error as CoreError, UserId,
  identity::IdentityProvider,
  profile::{ProfileUpdate, Registration, UserProfile, UserType},
};
use serde::Serialize;
use validator::Validate;

use crate::{
  AppState, Backend,
  auth::{Caller, basic_credentials, bearer_token},
  error::ApiError,
};

// ─── Registration ────────────────────────────────────────────────────────────

/// Create an account and its minimal profile.
///
/// Shared by `POST /auth/register` and the server's admin bootstrap, which
/// passes `allow_admin = true`.
pub async fn register_user<S: Backend>(
  state: &AppState<S>,
  registration: Registration,
  allow_admin: bool,
) -> Result<UserProfile, ApiError> {
  registration.validate().map_err(CoreError::from)?;
  if registration.user_type == UserType::Admin && !allow_admin {
    return Err(CoreError::Forbidden("administrator registration is disabled").into());
  }

  let user_id = state
    .identity
    .register_account(registration.email, registration.password)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Conflict("email is already registered".into()))?;

  let profile = UserProfile::minimal(
    user_id.clone(),
    registration.full_name,
    registration.user_type,
    registration.student_number,
  );
  match state.reporting.create_profile(profile).await {
    Ok(profile) => Ok(profile),
    Err(e) => {
      // An account without a profile can sign in but do nothing, and it
      // would hold the email.
      tracing::warn!(user_id = %user_id, error = %e, "profile creation failed; removing account");
      if let Err(cleanup) = state.identity.delete_account(user_id.clone()).await {
        tracing::error!(user_id = %user_id, error = %cleanup, "failed to remove account");
      }
      Err(e.into())
    }
  }
}

/// `POST /auth/register`
pub async fn register<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<Registration>,
) -> Result<impl IntoResponse, ApiError> {
  let allow_admin = state.settings.allow_admin_registration;
  let profile = register_user(&state, body, allow_admin).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub token:     String,
  pub user_id:   UserId,
  pub user_type: UserType,
}

/// `POST /auth/login` — `Authorization: Basic base64(email:password)`
pub async fn login<S: Backend>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Json<LoginResponse>, ApiError> {
  let (email, password) = basic_credentials(&headers)?;
  let user_id = state
    .identity
    .authenticate(email, password)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidCredentials)?;

  let profile = state.reporting.profile(Some(&user_id)).await?;
  let token = state
    .identity
    .open_session(user_id.clone())
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %user_id, "signed in");
  Ok(Json(LoginResponse { token, user_id, user_type: profile.user_type }))
}

/// `POST /auth/logout`
pub async fn logout<S: Backend>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
  let token = bearer_token(&headers).ok_or(CoreError::Unauthenticated)?;
  let closed = state
    .identity
    .close_session(token.to_owned())
    .await
    .map_err(ApiError::store)?;
  if !closed {
    return Err(CoreError::Unauthenticated.into());
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Own profile ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
  #[serde(flatten)]
  pub profile:        UserProfile,
  pub setup_required: bool,
}

/// `GET /me`
pub async fn me<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<MeResponse>, ApiError> {
  let profile = state.reporting.profile(caller.id()).await?;
  let setup_required = profile.setup_required();
  Ok(Json(MeResponse { profile, setup_required }))
}

/// `PATCH /me/profile` — accepted for a background merge.
pub async fn update_profile<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(update): Json<ProfileUpdate>,
) -> Result<StatusCode, ApiError> {
  if update.is_empty() {
    return Err(ApiError::BadRequest("no profile fields to update".into()));
  }
  state.reporting.update_profile(caller.id(), update).await?;
  Ok(StatusCode::ACCEPTED)
}
