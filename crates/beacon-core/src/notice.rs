//! Non-blocking failure notices for accepted writes.
//!
//! Writes run in the background once accepted. When one fails, the failure
//! is published here for whoever triggered it instead of being raised into
//! their flow. Nothing is retried.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::profile::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
  FileReport,
  ChangeStatus,
  UpdateProfile,
}

impl fmt::Display for WriteOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::FileReport => "file_report",
      Self::ChangeStatus => "change_status",
      Self::UpdateProfile => "update_profile",
    })
  }
}

/// One failed background write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
  /// The user whose action triggered the write.
  pub user_id:   UserId,
  pub operation: WriteOp,
  /// Key of the record the write targeted.
  pub key:       String,
  pub message:   String,
  pub at:        DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
  tx: broadcast::Sender<Notice>,
}

impl Notifier {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  pub fn publish(&self, notice: Notice) {
    let _ = self.tx.send(notice);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Notice> { self.tx.subscribe() }
}

impl Default for Notifier {
  fn default() -> Self { Self::new(crate::feed::DEFAULT_CAPACITY) }
}
