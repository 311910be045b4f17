//! Report status and the forward-only lifecycle.
//!
//! `New` → `Acknowledged` → `Resolved`. Status only ever moves forward; a
//! request that would not move it forward is a no-op rather than a
//! regression. The same rank comparison is repeated by the store inside its
//! conditional write, so concurrent administrators converge.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lifecycle stage of a report. Ordering follows the lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
)]
pub enum ReportStatus {
  #[default]
  New,
  Acknowledged,
  Resolved,
}

impl ReportStatus {
  pub const ALL: [Self; 3] = [Self::New, Self::Acknowledged, Self::Resolved];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Acknowledged => "Acknowledged",
      Self::Resolved => "Resolved",
    }
  }

  /// Integer position in the lifecycle, stored alongside the status so
  /// backends can compare ranks in a single conditional update.
  pub fn rank(self) -> u8 {
    match self {
      Self::New => 0,
      Self::Acknowledged => 1,
      Self::Resolved => 2,
    }
  }
}

impl fmt::Display for ReportStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReportStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|st| st.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| Error::UnknownStatus(s.to_owned()))
  }
}

/// Result of asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
  Applied {
    from: ReportStatus,
    to:   ReportStatus,
  },
  /// The report was already at or past the requested status.
  Unchanged { current: ReportStatus },
}

impl Transition {
  /// The status the report holds after the request.
  pub fn status(&self) -> ReportStatus {
    match self {
      Self::Applied { to, .. } => *to,
      Self::Unchanged { current } => *current,
    }
  }

  pub fn is_applied(&self) -> bool { matches!(self, Self::Applied { .. }) }
}

/// Reject targets no administrator action can produce. `New` is only ever
/// the initial state.
pub fn check_target(target: ReportStatus) -> Result<()> {
  match target {
    ReportStatus::New => Err(Error::InvalidTransition(target)),
    ReportStatus::Acknowledged | ReportStatus::Resolved => Ok(()),
  }
}

/// Compute the outcome of moving `current` toward `target`.
pub fn advance(current: ReportStatus, target: ReportStatus) -> Result<Transition> {
  check_target(target)?;
  if target > current {
    Ok(Transition::Applied { from: current, to: target })
  } else {
    Ok(Transition::Unchanged { current })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ReportStatus::*;

  #[test]
  fn forward_moves_apply() {
    assert_eq!(
      advance(New, Acknowledged).unwrap(),
      Transition::Applied { from: New, to: Acknowledged }
    );
    assert_eq!(
      advance(New, Resolved).unwrap(),
      Transition::Applied { from: New, to: Resolved }
    );
    assert_eq!(
      advance(Acknowledged, Resolved).unwrap(),
      Transition::Applied { from: Acknowledged, to: Resolved }
    );
  }

  #[test]
  fn acknowledging_resolved_report_is_noop() {
    let t = advance(Resolved, Acknowledged).unwrap();
    assert_eq!(t, Transition::Unchanged { current: Resolved });
    assert_eq!(t.status(), Resolved);
  }

  #[test]
  fn repeated_requests_are_idempotent() {
    assert!(!advance(Acknowledged, Acknowledged).unwrap().is_applied());
    assert!(!advance(Resolved, Resolved).unwrap().is_applied());
  }

  #[test]
  fn new_is_never_a_target() {
    for current in ReportStatus::ALL {
      assert!(matches!(
        advance(current, New),
        Err(Error::InvalidTransition(New))
      ));
    }
  }

  #[test]
  fn no_outcome_moves_backward() {
    for current in ReportStatus::ALL {
      for target in [Acknowledged, Resolved] {
        let after = advance(current, target).unwrap().status();
        assert!(after >= current, "{current} -> {target} gave {after}");
      }
    }
  }

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!("resolved".parse::<ReportStatus>().unwrap(), Resolved);
    assert_eq!("Acknowledged".parse::<ReportStatus>().unwrap(), Acknowledged);
    assert!("closed".parse::<ReportStatus>().is_err());
  }
}
