//! Static directory of emergency phone lines.

use serde::Serialize;

use crate::report::IncidentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotline {
  pub name:          &'static str,
  pub phone_number:  &'static str,
  /// The incident type a campus line serves. `None` for public lines.
  pub incident_type: Option<IncidentType>,
}

const fn campus(name: &'static str, phone_number: &'static str, t: IncidentType) -> Hotline {
  Hotline { name, phone_number, incident_type: Some(t) }
}

const fn public(name: &'static str, phone_number: &'static str) -> Hotline {
  Hotline { name, phone_number, incident_type: None }
}

pub const CAMPUS_LINES: [Hotline; 5] = [
  campus("Campus Fire Emergency", "013 002 0002", IncidentType::Fire),
  campus("Campus Medical Emergency", "013 002 0003", IncidentType::Medical),
  campus("Campus GBV Support", "013 002 0006", IncidentType::Gbv),
  campus("Campus Bullying Support", "013 002 0007", IncidentType::Bullying),
  campus("Campus Protection Services", "013 002 0010", IncidentType::Crime),
];

pub const PUBLIC_LINES: [Hotline; 3] = [
  public("Nationwide Emergency", "10177"),
  public("SAPS", "10111"),
  public("GBV Command Centre", "0800 428 428"),
];

/// The campus line to call for an incident of type `t`.
pub fn campus_line(t: IncidentType) -> Hotline {
  // Every type has exactly one line above.
  CAMPUS_LINES
    .into_iter()
    .find(|h| h.incident_type == Some(t))
    .unwrap_or(PUBLIC_LINES[0])
}

/// Campus lines first, then public lines.
pub fn directory() -> Vec<Hotline> {
  CAMPUS_LINES.into_iter().chain(PUBLIC_LINES).collect()
}
