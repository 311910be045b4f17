//! Incident reports — the write-once record at the heart of the service.
//!
//! Content fields are written exactly once by the reporter. The reporter's
//! name and student number are copied from their profile at submission time
//! and never re-derived. Only `status` changes afterwards.

use std::{borrow::Cow, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
  Error,
  lifecycle::ReportStatus,
  profile::{UserId, UserProfile},
};

/// Snapshot name used when the reporter never filled in their name.
pub const UNKNOWN_REPORTER: &str = "Unknown User";

// ─── Incident type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentType {
  Fire,
  Medical,
  #[serde(rename = "GBV")]
  Gbv,
  Bullying,
  Crime,
}

impl IncidentType {
  pub const ALL: [Self; 5] =
    [Self::Fire, Self::Medical, Self::Gbv, Self::Bullying, Self::Crime];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Fire => "Fire",
      Self::Medical => "Medical",
      Self::Gbv => "GBV",
      Self::Bullying => "Bullying",
      Self::Crime => "Crime",
    }
  }
}

impl fmt::Display for IncidentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for IncidentType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|t| t.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| Error::UnknownIncidentType(s.to_owned()))
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// One filed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
  pub id:                   Uuid,
  pub incident_type:        IncidentType,
  pub location_details:     String,
  pub detailed_description: String,
  /// Set once at submission; never changes.
  pub report_date_time:     DateTime<Utc>,
  pub user_id:              UserId,
  /// Snapshot of the reporter's `contactName`.
  pub user_name:            String,
  /// Snapshot of the reporter's `studentNumber`, empty when they had none.
  pub student_number:       String,
  /// Always empty; attachments are not collected.
  pub media_urls:           Vec<String>,
  pub status:               ReportStatus,
}

impl IncidentReport {
  /// Build the record for a validated submission by `reporter`.
  pub fn file(
    input: NewReport,
    reporter: &UserProfile,
    now: DateTime<Utc>,
  ) -> Self {
    let user_name = if reporter.contact_name.trim().is_empty() {
      UNKNOWN_REPORTER.to_owned()
    } else {
      reporter.contact_name.clone()
    };

    Self {
      id: Uuid::new_v4(),
      incident_type: input.incident_type,
      location_details: input.location_details,
      detailed_description: input.detailed_description,
      report_date_time: now,
      user_id: reporter.user_id.clone(),
      user_name,
      student_number: reporter.student_number.clone().unwrap_or_default(),
      media_urls: Vec::new(),
      status: ReportStatus::New,
    }
  }
}

// ─── Submission input ────────────────────────────────────────────────────────

/// The fields a reporter supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
  pub incident_type:        IncidentType,
  #[validate(length(min = 5, message = "Location must be at least 5 characters."))]
  pub location_details:     String,
  #[validate(length(min = 10, message = "Description must be at least 10 characters."))]
  pub detailed_description: String,
}

impl NewReport {
  /// Build from loosely-typed input, reporting an unknown incident type as
  /// a field error alongside any length errors.
  pub fn parse(
    incident_type: &str,
    location_details: impl Into<String>,
    detailed_description: impl Into<String>,
  ) -> Result<Self, Error> {
    let location_details = location_details.into();
    let detailed_description = detailed_description.into();

    match incident_type.parse::<IncidentType>() {
      Ok(incident_type) => {
        let report = Self { incident_type, location_details, detailed_description };
        report.validate()?;
        Ok(report)
      }
      Err(_) => {
        // Run the length checks against a placeholder type so every
        // field problem is reported at once.
        let probe = Self {
          incident_type: IncidentType::Fire,
          location_details,
          detailed_description,
        };
        let mut errors = probe.validate().err().unwrap_or_else(ValidationErrors::new);
        errors.add(
          "incidentType",
          ValidationError::new("incident_type")
            .with_message(Cow::Borrowed("You need to select an incident type.")),
        );
        Err(Error::Validation(errors))
      }
    }
  }
}

/// Render raw device coordinates as location text. No geocoding is done.
pub fn coordinates_as_location(latitude: f64, longitude: f64) -> String {
  format!("Lat: {latitude:.5}, Lon: {longitude:.5}")
}
