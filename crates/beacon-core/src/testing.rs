//! In-memory store used by this crate's unit tests.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  feed::{Change, ChangeFeed},
  lifecycle::{self, ReportStatus, Transition},
  profile::{ProfileUpdate, UserId, UserProfile, UserType},
  report::IncidentReport,
  store::{IncidentStore, ReportFilter},
};

#[derive(Debug, thiserror::Error)]
#[error("injected write failure")]
pub struct InjectedFailure;

#[derive(Default)]
pub struct MemoryStore {
  profiles:    Mutex<HashMap<UserId, UserProfile>>,
  reports:     Mutex<BTreeMap<Uuid, IncidentReport>>,
  feed:        ChangeFeed,
  fail_writes: AtomicBool,
}

impl MemoryStore {
  /// Make every subsequent write fail.
  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  fn check_writable(&self) -> Result<(), InjectedFailure> {
    if self.fail_writes.load(Ordering::SeqCst) {
      Err(InjectedFailure)
    } else {
      Ok(())
    }
  }

  pub fn report_count(&self) -> usize { self.reports.lock().unwrap().len() }
}

impl IncidentStore for MemoryStore {
  type Error = InjectedFailure;

  async fn insert_profile(&self, profile: UserProfile) -> Result<bool, InjectedFailure> {
    self.check_writable()?;
    let mut profiles = self.profiles.lock().unwrap();
    if profiles.contains_key(&profile.user_id) {
      return Ok(false);
    }
    profiles.insert(profile.user_id.clone(), profile.clone());
    self.feed.publish(Change::ProfileChanged(profile));
    Ok(true)
  }

  async fn merge_profile(
    &self,
    user_id: UserId,
    update: ProfileUpdate,
  ) -> Result<Option<UserProfile>, InjectedFailure> {
    self.check_writable()?;
    let mut profiles = self.profiles.lock().unwrap();
    let Some(profile) = profiles.get_mut(&user_id) else {
      return Ok(None);
    };
    profile.apply(&update);
    let merged = profile.clone();
    self.feed.publish(Change::ProfileChanged(merged.clone()));
    Ok(Some(merged))
  }

  async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, InjectedFailure> {
    Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
  }

  async fn list_profiles(&self) -> Result<Vec<UserProfile>, InjectedFailure> {
    Ok(self.profiles.lock().unwrap().values().cloned().collect())
  }

  async fn insert_report(&self, report: IncidentReport) -> Result<(), InjectedFailure> {
    self.check_writable()?;
    self.reports.lock().unwrap().insert(report.id, report.clone());
    self.feed.publish(Change::ReportFiled(report));
    Ok(())
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>, InjectedFailure> {
    Ok(self.reports.lock().unwrap().get(&id).cloned())
  }

  async fn list_reports(
    &self,
    filter: ReportFilter,
  ) -> Result<Vec<IncidentReport>, InjectedFailure> {
    Ok(
      self
        .reports
        .lock()
        .unwrap()
        .values()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect(),
    )
  }

  async fn advance_status(
    &self,
    id: Uuid,
    target: ReportStatus,
  ) -> Result<Option<(IncidentReport, Transition)>, InjectedFailure> {
    self.check_writable()?;
    let mut reports = self.reports.lock().unwrap();
    let Some(report) = reports.get_mut(&id) else {
      return Ok(None);
    };
    let transition = lifecycle::advance(report.status, target)
      .unwrap_or(Transition::Unchanged { current: report.status });
    report.status = transition.status();
    let stored = report.clone();
    if transition.is_applied() {
      self.feed.publish(Change::StatusChanged(stored.clone()));
    }
    Ok(Some((stored, transition)))
  }

  fn changes(&self) -> broadcast::Receiver<Change> { self.feed.subscribe() }
}

/// A complete student profile.
pub fn student(id: &str) -> UserProfile {
  UserProfile {
    user_id:                        UserId::from(id),
    contact_name:                   format!("Student {id}"),
    contact_phone_number:           "0123456789".into(),
    emergency_contact_name:         "Guardian".into(),
    emergency_contact_phone_number: "0987654321".into(),
    medical_information:            None,
    student_number:                 Some(format!("S-{id}")),
    user_type:                      UserType::Student,
  }
}

pub fn admin(id: &str) -> UserProfile {
  UserProfile {
    user_type: UserType::Admin,
    student_number: None,
    ..student(id)
  }
}
