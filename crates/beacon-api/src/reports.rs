//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports` | `?scope=own\|all` (default `own`), optional `limit`; newest first |
//! | `POST` | `/reports` | Body: [`CreateBody`]; 202 + report |
//! | `GET`  | `/reports/{id}` | 404 if not found |
//! | `POST` | `/reports/{id}/status` | Body: `{"status":"Acknowledged"}`; administrators only; 202 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{
  lifecycle::ReportStatus,
  report::{IncidentReport, NewReport},
  view::{self, ReportQuery},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, Backend, auth::Caller, error::ApiError};

/// Which reports a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
  #[default]
  Own,
  All,
}

impl Scope {
  pub fn query(self, caller: &Caller) -> Result<ReportQuery, ApiError> {
    match self {
      Scope::All => Ok(ReportQuery::All),
      Scope::Own => {
        let user_id = caller.id().ok_or(beacon_core::Error::Unauthenticated)?;
        Ok(ReportQuery::Own(user_id.clone()))
      }
    }
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub scope: Scope,
  pub limit: Option<usize>,
}

/// `GET /reports[?scope=own|all][&limit=n]`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<IncidentReport>>, ApiError> {
  let reports = match params.scope {
    Scope::Own => state.reporting.own_reports(caller.id()).await?,
    Scope::All => state.reporting.all_reports(caller.id()).await?,
  };
  let limit = params.limit.unwrap_or(reports.len());
  Ok(Json(view::recent(&reports, limit)))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// Loosely typed so an unknown incident type is reported as a field error
/// together with any other field problems.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBody {
  pub incident_type:        String,
  pub location_details:     String,
  pub detailed_description: String,
}

/// `POST /reports`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  if caller.id().is_none() {
    return Err(beacon_core::Error::Unauthenticated.into());
  }
  let input = NewReport::parse(
    &body.incident_type,
    body.location_details,
    body.detailed_description,
  )?;
  let submission = state.reporting.submit_report(caller.id(), input).await?;
  Ok((StatusCode::ACCEPTED, Json(submission.report)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /reports/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<IncidentReport>, ApiError> {
  let report = state
    .reporting
    .report_detail(caller.id(), id)
    .await?
    .into_option()
    .ok_or_else(|| ApiError::NotFound(format!("report {id} not found")))?;
  Ok(Json(report))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusAccepted {
  pub id:        Uuid,
  pub requested: ReportStatus,
}

/// `POST /reports/{id}/status`
pub async fn change_status<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError> {
  let target: ReportStatus = body.status.parse()?;
  state
    .reporting
    .change_status(caller.id(), id, target)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("report {id} not found")))?;
  Ok((StatusCode::ACCEPTED, Json(StatusAccepted { id, requested: target })))
}
