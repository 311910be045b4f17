//! [`Reporting`] — every operation of the service, behind one context object.
//!
//! Built once at process start around a store handle and a [`Notifier`], then
//! cloned into whatever transport serves requests. Checks run in a fixed
//! order: authentication, input validation, profile/role preconditions.
//! Accepted writes are dispatched to a background task and never block the
//! caller; a failure there becomes a [`Notice`] and settles the returned
//! [`Pending`] with an error.

use std::{future::Future, sync::Arc};

use chrono::Utc;
use tokio::sync::oneshot;
use uuid::Uuid;
use validator::Validate;

use crate::{
  Error, Result,
  lifecycle::{self, ReportStatus, Transition},
  notice::{Notice, Notifier, WriteOp},
  policy::{self, Actor, Permission},
  profile::{ProfileUpdate, UserId, UserProfile},
  report::{IncidentReport, NewReport},
  store::{IncidentStore, ReportFilter},
  view::{Detail, ReportQuery, Subscription},
};

// ─── Pending writes ──────────────────────────────────────────────────────────

/// Handle to a write running in the background. Dropping it is fine; the
/// write still completes and any failure is still published as a notice.
#[derive(Debug)]
pub struct Pending<T> {
  rx: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
  /// Wait until the write is durable or has failed.
  pub async fn settled(self) -> Result<T> {
    self.rx.await.unwrap_or(Err(Error::WriteAborted))
  }
}

/// A report accepted for filing, returned before it is durable.
#[derive(Debug)]
pub struct Submission {
  pub report:  IncidentReport,
  pub pending: Pending<()>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct Reporting<S> {
  store:   Arc<S>,
  notices: Notifier,
}

impl<S> Clone for Reporting<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), notices: self.notices.clone() }
  }
}

impl<S> Reporting<S>
where
  S: IncidentStore + 'static,
{
  pub fn new(store: Arc<S>, notices: Notifier) -> Self { Self { store, notices } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn notices(&self) -> &Notifier { &self.notices }

  // ── Identity ──────────────────────────────────────────────────────────

  /// Resolve the caller to an [`Actor`]. Fails with `Unauthenticated` when
  /// there is no caller and `ProfileRequired` when they have no profile.
  pub async fn actor(&self, caller: Option<&UserId>) -> Result<Actor> {
    let profile = self.require_profile(caller).await?;
    Ok(Actor::from_profile(&profile))
  }

  async fn require_profile(&self, caller: Option<&UserId>) -> Result<UserProfile> {
    let user_id = caller.ok_or(Error::Unauthenticated)?;
    self
      .store
      .get_profile(user_id.clone())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::ProfileRequired(user_id.clone()))
  }

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Write the minimal profile created at registration. Unlike the other
  /// writes this one is awaited: the account is unusable without it.
  pub async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile> {
    let created = self
      .store
      .insert_profile(profile.clone())
      .await
      .map_err(Error::store)?;
    if !created {
      return Err(Error::ProfileExists(profile.user_id));
    }
    tracing::info!(user_id = %profile.user_id, user_type = profile.user_type.as_str(), "profile created");
    Ok(profile)
  }

  pub async fn profile(&self, caller: Option<&UserId>) -> Result<UserProfile> {
    self.require_profile(caller).await
  }

  /// Merge a partial update onto the caller's own profile.
  pub async fn update_profile(
    &self,
    caller: Option<&UserId>,
    update: ProfileUpdate,
  ) -> Result<Pending<UserProfile>> {
    let user_id = caller.ok_or(Error::Unauthenticated)?.clone();
    update.validate()?;
    self.require_profile(Some(&user_id)).await?;

    let store = self.store.clone();
    let key = user_id.to_string();
    let owner = user_id.clone();
    Ok(self.dispatch(owner, WriteOp::UpdateProfile, key, async move {
      store
        .merge_profile(user_id.clone(), update)
        .await
        .map_err(Error::store)?
        .ok_or(Error::ProfileRequired(user_id))
    }))
  }

  /// The user directory. Administrators only.
  pub async fn users(&self, caller: Option<&UserId>) -> Result<Vec<UserProfile>> {
    let actor = self.actor(caller).await?;
    policy::authorize(&actor, Permission::ListUsers)?;
    let mut profiles = self.store.list_profiles().await.map_err(Error::store)?;
    profiles.sort_by(|a, b| a.contact_name.cmp(&b.contact_name));
    Ok(profiles)
  }

  // ── Reports ───────────────────────────────────────────────────────────

  /// File a report for the caller. Returns as soon as the record is built;
  /// persistence continues in the background.
  pub async fn submit_report(
    &self,
    caller: Option<&UserId>,
    input: NewReport,
  ) -> Result<Submission> {
    caller.ok_or(Error::Unauthenticated)?;
    input.validate()?;
    let reporter = self.require_profile(caller).await?;

    let report = IncidentReport::file(input, &reporter, Utc::now());
    tracing::info!(
      report_id = %report.id,
      incident_type = %report.incident_type,
      user_id = %report.user_id,
      "report accepted"
    );

    let store = self.store.clone();
    let record = report.clone();
    let pending = self.dispatch(
      reporter.user_id,
      WriteOp::FileReport,
      report.id.to_string(),
      async move { store.insert_report(record).await.map_err(Error::store) },
    );

    Ok(Submission { report, pending })
  }

  /// Ask for `id` to move to `target`. Administrators only.
  ///
  /// Returns `None` when no such report exists. Otherwise the write is
  /// dispatched and its outcome is an applied or unchanged [`Transition`].
  pub async fn change_status(
    &self,
    caller: Option<&UserId>,
    id: Uuid,
    target: ReportStatus,
  ) -> Result<Option<Pending<(IncidentReport, Transition)>>> {
    let actor = self.actor(caller).await?;
    policy::authorize(&actor, Permission::ChangeStatus)?;
    lifecycle::check_target(target)?;

    if self.store.get_report(id).await.map_err(Error::store)?.is_none() {
      return Ok(None);
    }

    let store = self.store.clone();
    let admin = actor.user_id.clone();
    Ok(Some(self.dispatch(
      actor.user_id,
      WriteOp::ChangeStatus,
      id.to_string(),
      async move {
        let (report, transition) = store
          .advance_status(id, target)
          .await
          .map_err(Error::store)?
          .ok_or(Error::ReportNotFound(id))?;
        match transition {
          Transition::Applied { from, to } => {
            tracing::info!(report_id = %id, %from, %to, admin = %admin, "status changed");
          }
          Transition::Unchanged { current } => {
            tracing::debug!(report_id = %id, %current, requested = %target, "status unchanged");
          }
        }
        Ok((report, transition))
      },
    )))
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn own_reports(&self, caller: Option<&UserId>) -> Result<Vec<IncidentReport>> {
    let actor = self.actor(caller).await?;
    self
      .store
      .list_reports(ReportFilter::owned_by(actor.user_id))
      .await
      .map_err(Error::store)
  }

  pub async fn all_reports(&self, caller: Option<&UserId>) -> Result<Vec<IncidentReport>> {
    let actor = self.actor(caller).await?;
    policy::authorize(&actor, Permission::ListAllReports)?;
    self
      .store
      .list_reports(ReportFilter::default())
      .await
      .map_err(Error::store)
  }

  /// Look up one report. A missing id is [`Detail::NotFound`]; someone
  /// else's report is `Forbidden` unless the caller is an administrator.
  pub async fn report_detail(&self, caller: Option<&UserId>, id: Uuid) -> Result<Detail> {
    let actor = self.actor(caller).await?;
    let report = self.store.get_report(id).await.map_err(Error::store)?;
    if let Some(r) = &report {
      policy::authorize(&actor, Permission::ReadReportsOf(&r.user_id))?;
    }
    Ok(report.into())
  }

  /// Open a live view. `Own` views are always scoped to the caller;
  /// `All` requires an administrator.
  pub async fn watch(
    &self,
    caller: Option<&UserId>,
    query: ReportQuery,
  ) -> Result<Subscription<S>> {
    let actor = self.actor(caller).await?;
    match &query {
      ReportQuery::Own(owner) => {
        policy::authorize(&actor, Permission::ReadReportsOf(owner))?;
      }
      ReportQuery::All => policy::authorize(&actor, Permission::ListAllReports)?,
      ReportQuery::Single(id) => {
        if let Some(r) = self.store.get_report(*id).await.map_err(Error::store)? {
          policy::authorize(&actor, Permission::ReadReportsOf(&r.user_id))?;
        }
      }
    }
    // A report filed after opening is checked as it arrives.
    Ok(Subscription::open(self.store.clone(), query).await?.visible_to(actor))
  }

  // ── Background writes ─────────────────────────────────────────────────

  fn dispatch<T, F>(
    &self,
    user_id: UserId,
    operation: WriteOp,
    key: String,
    write: F,
  ) -> Pending<T>
  where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    let notices = self.notices.clone();

    tokio::spawn(async move {
      let result = write.await;
      if let Err(e) = &result {
        tracing::warn!(%operation, %key, user_id = %user_id, error = %e, "background write failed");
        notices.publish(Notice {
          user_id,
          operation,
          key,
          message: e.to_string(),
          at: Utc::now(),
        });
      }
      let _ = tx.send(result);
    });

    Pending { rx }
  }
}
