//! Error types for `beacon-core`.

use thiserror::Error;
use validator::ValidationErrors;

use crate::{lifecycle::ReportStatus, profile::UserId};

#[derive(Debug, Error)]
pub enum Error {
  /// Field-level input errors, reported before any write.
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationErrors),

  #[error("authentication required")]
  Unauthenticated,

  #[error("user {0} has no profile")]
  ProfileRequired(UserId),

  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("{0} is not a valid transition target")]
  InvalidTransition(ReportStatus),

  #[error("profile already exists for user {0}")]
  ProfileExists(UserId),

  #[error("report {0} not found")]
  ReportNotFound(uuid::Uuid),

  #[error("unknown incident type: {0:?}")]
  UnknownIncidentType(String),

  #[error("unknown report status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown user type: {0:?}")]
  UnknownUserType(String),

  /// The background task performing an accepted write went away before
  /// reporting back.
  #[error("write task aborted")]
  WriteAborted,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box any backend error into [`Error::Store`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
