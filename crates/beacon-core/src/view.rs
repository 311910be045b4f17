//! Live query views over the incident store.
//!
//! A [`Subscription`] registers interest in a [`ReportQuery`], yields the
//! current result set, and then yields a fresh snapshot every time a change
//! touching that result set is published. Dropping it unsubscribes.

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
  Error, Result,
  feed::Change,
  policy::{self, Actor, Permission},
  profile::UserId,
  report::IncidentReport,
  store::{IncidentStore, ReportFilter},
};

// ─── Queries and results ─────────────────────────────────────────────────────

/// The three read projections over reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportQuery {
  /// Reports filed by one user.
  Own(UserId),
  /// Every report. Administrators only.
  All,
  /// One report by id.
  Single(Uuid),
}

impl ReportQuery {
  /// Whether `report` belongs in this query's result set.
  pub fn touches(&self, report: &IncidentReport) -> bool {
    match self {
      Self::Own(user_id) => report.user_id == *user_id,
      Self::All => true,
      Self::Single(id) => report.id == *id,
    }
  }

  fn filter(&self) -> ReportFilter {
    match self {
      Self::Own(user_id) => ReportFilter::owned_by(user_id.clone()),
      Self::All | Self::Single(_) => ReportFilter::default(),
    }
  }
}

/// Result of a single-report lookup. Absence is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum Detail {
  Found(IncidentReport),
  NotFound,
}

impl Detail {
  pub fn into_option(self) -> Option<IncidentReport> {
    match self {
      Self::Found(r) => Some(r),
      Self::NotFound => None,
    }
  }
}

impl From<Option<IncidentReport>> for Detail {
  fn from(r: Option<IncidentReport>) -> Self {
    r.map_or(Self::NotFound, Self::Found)
  }
}

/// One emission of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
  Reports(Vec<IncidentReport>),
  Detail(Detail),
}

/// The `n` most recently filed reports, newest first.
pub fn recent(reports: &[IncidentReport], n: usize) -> Vec<IncidentReport> {
  let mut sorted = reports.to_vec();
  sorted.sort_by(|a, b| b.report_date_time.cmp(&a.report_date_time));
  sorted.truncate(n);
  sorted
}

// ─── Subscription ────────────────────────────────────────────────────────────

pub struct Subscription<S: IncidentStore> {
  store:   Arc<S>,
  query:   ReportQuery,
  rx:      broadcast::Receiver<Change>,
  current: BTreeMap<Uuid, IncidentReport>,
  primed:  bool,
  /// When set, reports this actor may not read are left out of snapshots.
  viewer:  Option<Actor>,
}

impl<S: IncidentStore> Subscription<S> {
  /// Register on the store's feed, then load the initial result set.
  /// Registering first means no write can fall between load and listen.
  pub async fn open(store: Arc<S>, query: ReportQuery) -> Result<Self> {
    let rx = store.changes();
    let mut sub = Self {
      store,
      query,
      rx,
      current: BTreeMap::new(),
      primed: false,
      viewer: None,
    };
    sub.reload().await?;
    Ok(sub)
  }

  /// Restrict every snapshot to the reports `actor` may read.
  pub fn visible_to(mut self, actor: Actor) -> Self {
    self.viewer = Some(actor);
    self
  }

  pub fn query(&self) -> &ReportQuery { &self.query }

  fn may_see(&self, report: &IncidentReport) -> bool {
    self.viewer.as_ref().is_none_or(|actor| {
      policy::authorize(actor, Permission::ReadReportsOf(&report.user_id)).is_ok()
    })
  }

  /// The result set as currently known, without waiting.
  pub fn snapshot(&self) -> Snapshot {
    match self.query {
      ReportQuery::Single(id) => Snapshot::Detail(
        self.current.get(&id).filter(|r| self.may_see(r)).cloned().into(),
      ),
      ReportQuery::Own(_) | ReportQuery::All => Snapshot::Reports(
        self.current.values().filter(|r| self.may_see(r)).cloned().collect(),
      ),
    }
  }

  /// Wait for the next snapshot. The first call returns the initial result
  /// set immediately. Returns `None` once the store's feed has shut down.
  pub async fn next(&mut self) -> Option<Result<Snapshot>> {
    if !self.primed {
      self.primed = true;
      return Some(Ok(self.snapshot()));
    }

    loop {
      match self.rx.recv().await {
        Ok(change) => {
          if let Some(report) = change.report()
            && self.query.touches(report)
          {
            self.fold(report.clone());
            return Some(Ok(self.snapshot()));
          }
        }
        Err(RecvError::Lagged(skipped)) => {
          tracing::debug!(skipped, query = ?self.query, "view lagged; reloading");
          if let Err(e) = self.reload().await {
            return Some(Err(e));
          }
          return Some(Ok(self.snapshot()));
        }
        Err(RecvError::Closed) => return None,
      }
    }
  }

  /// Unsubscribe explicitly. Equivalent to dropping.
  pub fn close(self) {}

  async fn reload(&mut self) -> Result<()> {
    let reports = match self.query {
      ReportQuery::Single(id) => self
        .store
        .get_report(id)
        .await
        .map_err(Error::store)?
        .into_iter()
        .collect(),
      _ => self
        .store
        .list_reports(self.query.filter())
        .await
        .map_err(Error::store)?,
    };

    let mut fresh = BTreeMap::new();
    for report in reports {
      fresh.insert(report.id, report);
    }
    // A reload must not hand back an older status than already observed.
    for (id, report) in fresh.iter_mut() {
      if let Some(seen) = self.current.get(id) {
        report.status = report.status.max(seen.status);
      }
    }
    self.current = fresh;
    Ok(())
  }

  /// Apply one published report, never letting an observed status regress
  /// when publications from concurrent writers arrive out of order.
  fn fold(&mut self, mut report: IncidentReport) {
    if let Some(seen) = self.current.get(&report.id) {
      report.status = report.status.max(seen.status);
    }
    self.current.insert(report.id, report);
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};

  use super::*;
  use crate::{
    lifecycle::ReportStatus,
    report::{IncidentType, NewReport},
    testing::{MemoryStore, student},
  };

  fn report_for(user: &str) -> IncidentReport {
    let input = NewReport {
      incident_type:        IncidentType::Medical,
      location_details:     "Main Library, 2nd Floor".into(),
      detailed_description: "Student fainted in the library.".into(),
    };
    IncidentReport::file(input, &student(user), Utc::now())
  }

  #[test]
  fn recent_takes_newest_first() {
    let now = Utc::now();
    let mut reports: Vec<_> = (0..5).map(|_| report_for("u")).collect();
    for (i, r) in reports.iter_mut().enumerate() {
      r.report_date_time = now - Duration::minutes(i as i64);
    }
    let top = recent(&reports, 3);
    assert_eq!(top.len(), 3);
    assert_eq!(top[0].id, reports[0].id);
    assert_eq!(top[2].id, reports[2].id);
  }

  #[tokio::test]
  async fn own_view_sees_only_owner_and_live_updates() {
    let store = Arc::new(MemoryStore::default());
    let mine = report_for("alice");
    store.insert_report(mine.clone()).await.unwrap();
    store.insert_report(report_for("bob")).await.unwrap();

    let mut sub = Subscription::open(store.clone(), ReportQuery::Own(UserId::from("alice")))
      .await
      .unwrap();

    let Snapshot::Reports(initial) = sub.next().await.unwrap().unwrap() else {
      panic!("expected a report list");
    };
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].id, mine.id);

    // Someone else's report does not wake the view; the status change does.
    store.insert_report(report_for("bob")).await.unwrap();
    store.advance_status(mine.id, ReportStatus::Acknowledged).await.unwrap();

    let Snapshot::Reports(updated) = sub.next().await.unwrap().unwrap() else {
      panic!("expected a report list");
    };
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].status, ReportStatus::Acknowledged);
  }

  #[tokio::test]
  async fn single_view_reports_not_found_then_found() {
    let store = Arc::new(MemoryStore::default());
    let report = report_for("alice");

    let mut sub = Subscription::open(store.clone(), ReportQuery::Single(report.id))
      .await
      .unwrap();
    assert_eq!(
      sub.next().await.unwrap().unwrap(),
      Snapshot::Detail(Detail::NotFound)
    );

    store.insert_report(report.clone()).await.unwrap();
    assert_eq!(
      sub.next().await.unwrap().unwrap(),
      Snapshot::Detail(Detail::Found(report))
    );
  }

  #[tokio::test]
  async fn out_of_order_publication_does_not_regress_status() {
    let store = Arc::new(MemoryStore::default());
    let report = report_for("alice");
    store.insert_report(report.clone()).await.unwrap();

    let mut sub = Subscription::open(store.clone(), ReportQuery::All).await.unwrap();
    sub.next().await.unwrap().unwrap();

    let mut resolved = report.clone();
    resolved.status = ReportStatus::Resolved;
    sub.fold(resolved);
    let mut stale = report.clone();
    stale.status = ReportStatus::Acknowledged;
    sub.fold(stale);

    let Snapshot::Reports(list) = sub.snapshot() else { unreachable!() };
    assert_eq!(list[0].status, ReportStatus::Resolved);
  }
}
