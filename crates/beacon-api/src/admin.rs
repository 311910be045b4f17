//! Administrator directory and the public hotline list.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/users` | Administrators only; sorted by name |
//! | `GET`  | `/hotlines` | No authentication |

use axum::{Json, extract::State};
use beacon_core::{
  hotline::{self, Hotline},
  profile::UserProfile,
};

use crate::{AppState, Backend, auth::Caller, error::ApiError};

/// `GET /admin/users`
pub async fn users<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
  Ok(Json(state.reporting.users(caller.id()).await?))
}

/// `GET /hotlines`
pub async fn hotlines() -> Json<Vec<Hotline>> { Json(hotline::directory()) }
