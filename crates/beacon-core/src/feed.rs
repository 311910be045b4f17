//! In-process change feed published by store backends.
//!
//! Every successful write is broadcast as a [`Change`]. Live views subscribe
//! to the feed and fold changes into their snapshots.

use tokio::sync::broadcast;

use crate::{profile::UserProfile, report::IncidentReport};

/// Default number of changes buffered per subscriber before it lags.
pub const DEFAULT_CAPACITY: usize = 256;

/// A write that has been made durable.
#[derive(Debug, Clone)]
pub enum Change {
  ReportFiled(IncidentReport),
  /// Carries the report as stored after the status write.
  StatusChanged(IncidentReport),
  ProfileChanged(UserProfile),
}

impl Change {
  pub fn report(&self) -> Option<&IncidentReport> {
    match self {
      Self::ReportFiled(r) | Self::StatusChanged(r) => Some(r),
      Self::ProfileChanged(_) => None,
    }
  }
}

/// Cheap-to-clone broadcast handle.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
  tx: broadcast::Sender<Change>,
}

impl ChangeFeed {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  /// Publish a change. Having no subscribers is not an error.
  pub fn publish(&self, change: Change) {
    let _ = self.tx.send(change);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Change> { self.tx.subscribe() }
}

impl Default for ChangeFeed {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}
