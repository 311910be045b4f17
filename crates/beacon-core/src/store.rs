//! The `IncidentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `beacon-store-sqlite`).
//! Higher layers (`beacon-api`, the server binary) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  feed::Change,
  lifecycle::{ReportStatus, Transition},
  profile::{ProfileUpdate, UserId, UserProfile},
  report::IncidentReport,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Equality filter for [`IncidentStore::list_reports`]. The default matches
/// every report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
  pub user_id: Option<UserId>,
}

impl ReportFilter {
  pub fn owned_by(user_id: UserId) -> Self { Self { user_id: Some(user_id) } }

  pub fn matches(&self, report: &IncidentReport) -> bool {
    self.user_id.as_ref().is_none_or(|u| *u == report.user_id)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a document store holding profiles and reports.
///
/// Reports are write-once apart from their status, which only moves forward.
/// Every successful write must be published on the feed returned by
/// [`IncidentStore::changes`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IncidentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Create a profile keyed by its `user_id`. Returns `false` without
  /// writing if one already exists.
  fn insert_profile(
    &self,
    profile: UserProfile,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Merge the present fields of `update` onto the stored profile in one
  /// atomic write. Returns the merged profile, or `None` if there is no
  /// profile for `user_id`.
  fn merge_profile(
    &self,
    user_id: UserId,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  /// Retrieve a profile by key. Returns `None` if not found.
  fn get_profile(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  fn list_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<UserProfile>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Persist a new report keyed by its `id`.
  fn insert_report(
    &self,
    report: IncidentReport,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a report by id. Returns `None` if not found.
  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<IncidentReport>, Self::Error>> + Send + '_;

  /// All reports matching `filter`, in no particular order.
  fn list_reports(
    &self,
    filter: ReportFilter,
  ) -> impl Future<Output = Result<Vec<IncidentReport>, Self::Error>> + Send + '_;

  /// Move the report's status toward `target`, only if that moves it
  /// forward. The comparison and the write must be a single atomic step.
  ///
  /// Returns the stored report with the outcome, or `None` if no report has
  /// this id.
  fn advance_status(
    &self,
    id: Uuid,
    target: ReportStatus,
  ) -> impl Future<Output = Result<Option<(IncidentReport, Transition)>, Self::Error>>
  + Send
  + '_;

  // ── Change feed ───────────────────────────────────────────────────────

  /// Subscribe to writes made through this store.
  fn changes(&self) -> broadcast::Receiver<Change>;
}
