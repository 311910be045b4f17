//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their wire names (`"Fire"`, `"GBV"`, `"New"`, `"student"`). The
//! attachment list is compact JSON.

use beacon_core::{
  UserId,
  lifecycle::ReportStatus,
  profile::{UserProfile, UserType},
  report::{IncidentReport, IncidentType},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Media URLs ──────────────────────────────────────────────────────────────

pub fn encode_media(urls: &[String]) -> Result<String> {
  Ok(serde_json::to_string(urls)?)
}

pub fn decode_media(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str = "user_id, contact_name, contact_phone_number,
  emergency_contact_name, emergency_contact_phone_number,
  medical_information, student_number, user_type";

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:                        String,
  pub contact_name:                   String,
  pub contact_phone_number:           String,
  pub emergency_contact_name:         String,
  pub emergency_contact_phone_number: String,
  pub medical_information:            Option<String>,
  pub student_number:                 Option<String>,
  pub user_type:                      String,
}

impl RawProfile {
  /// Read a row selected with [`PROFILE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:                        row.get(0)?,
      contact_name:                   row.get(1)?,
      contact_phone_number:           row.get(2)?,
      emergency_contact_name:         row.get(3)?,
      emergency_contact_phone_number: row.get(4)?,
      medical_information:            row.get(5)?,
      student_number:                 row.get(6)?,
      user_type:                      row.get(7)?,
    })
  }

  pub fn into_profile(self) -> Result<UserProfile> {
    Ok(UserProfile {
      user_id:                        UserId::new(self.user_id),
      contact_name:                   self.contact_name,
      contact_phone_number:           self.contact_phone_number,
      emergency_contact_name:         self.emergency_contact_name,
      emergency_contact_phone_number: self.emergency_contact_phone_number,
      medical_information:            self.medical_information,
      student_number:                 self.student_number,
      user_type:                      self.user_type.parse::<UserType>()?,
    })
  }
}

pub const REPORT_COLUMNS: &str = "id, incident_type, location_details,
  detailed_description, report_date_time, user_id, user_name,
  student_number, media_urls, status";

/// Raw strings read directly from an `incident_reports` row.
pub struct RawReport {
  pub id:                   String,
  pub incident_type:        String,
  pub location_details:     String,
  pub detailed_description: String,
  pub report_date_time:     String,
  pub user_id:              String,
  pub user_name:            String,
  pub student_number:       String,
  pub media_urls:           String,
  pub status:               String,
}

impl RawReport {
  /// Read a row selected with [`REPORT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      incident_type:        row.get(1)?,
      location_details:     row.get(2)?,
      detailed_description: row.get(3)?,
      report_date_time:     row.get(4)?,
      user_id:              row.get(5)?,
      user_name:            row.get(6)?,
      student_number:       row.get(7)?,
      media_urls:           row.get(8)?,
      status:               row.get(9)?,
    })
  }

  pub fn into_report(self) -> Result<IncidentReport> {
    Ok(IncidentReport {
      id:                   decode_uuid(&self.id)?,
      incident_type:        self.incident_type.parse::<IncidentType>()?,
      location_details:     self.location_details,
      detailed_description: self.detailed_description,
      report_date_time:     decode_dt(&self.report_date_time)?,
      user_id:              UserId::new(self.user_id),
      user_name:            self.user_name,
      student_number:       self.student_number,
      media_urls:           decode_media(&self.media_urls)?,
      status:               self.status.parse::<ReportStatus>()?,
    })
  }
}
