//! [`SqliteStore`] — the SQLite implementation of [`IncidentStore`].

use std::path::Path;

use beacon_core::{
  UserId,
  feed::{Change, ChangeFeed},
  lifecycle::{ReportStatus, Transition},
  profile::{ProfileUpdate, UserProfile},
  report::IncidentReport,
  store::{IncidentStore, ReportFilter},
};
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    PROFILE_COLUMNS, REPORT_COLUMNS, RawProfile, RawReport, encode_dt, encode_media,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Beacon store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the change feed.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  feed:            ChangeFeed,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, feed: ChangeFeed::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, feed: ChangeFeed::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the change feed with one buffering `capacity` changes per
  /// subscriber. Call before anything subscribes.
  pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
    self.feed = ChangeFeed::new(capacity);
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── IncidentStore impl ──────────────────────────────────────────────────────

impl IncidentStore for SqliteStore {
  type Error = crate::Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn insert_profile(&self, profile: UserProfile) -> Result<bool> {
    let p = profile.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO profiles (
             user_id, contact_name, contact_phone_number,
             emergency_contact_name, emergency_contact_phone_number,
             medical_information, student_number, user_type
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            p.user_id.as_str(),
            p.contact_name,
            p.contact_phone_number,
            p.emergency_contact_name,
            p.emergency_contact_phone_number,
            p.medical_information,
            p.student_number,
            p.user_type.as_str(),
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    if inserted {
      self.feed.publish(Change::ProfileChanged(profile));
    }
    Ok(inserted)
  }

  async fn merge_profile(
    &self,
    user_id: UserId,
    update: ProfileUpdate,
  ) -> Result<Option<UserProfile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE profiles SET
             contact_name                   = COALESCE(?2, contact_name),
             contact_phone_number           = COALESCE(?3, contact_phone_number),
             emergency_contact_name         = COALESCE(?4, emergency_contact_name),
             emergency_contact_phone_number = COALESCE(?5, emergency_contact_phone_number),
             medical_information            = COALESCE(?6, medical_information)
           WHERE user_id = ?1",
          rusqlite::params![
            user_id.as_str(),
            update.contact_name,
            update.contact_phone_number,
            update.emergency_contact_name,
            update.emergency_contact_phone_number,
            update.medical_information,
          ],
        )?;
        if n == 0 {
          return Ok(None);
        }
        let raw = tx.query_row(
          &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
          rusqlite::params![user_id.as_str()],
          RawProfile::from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    let merged = raw.map(RawProfile::into_profile).transpose()?;
    if let Some(p) = &merged {
      self.feed.publish(Change::ProfileChanged(p.clone()));
    }
    Ok(merged)
  }

  async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
              rusqlite::params![user_id.as_str()],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self) -> Result<Vec<UserProfile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles"))?;
        let rows = stmt
          .query_map([], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn insert_report(&self, report: IncidentReport) -> Result<()> {
    let id_str         = encode_uuid(report.id);
    let type_str       = report.incident_type.as_str();
    let location       = report.location_details.clone();
    let description    = report.detailed_description.clone();
    let reported_at    = encode_dt(report.report_date_time);
    let user_id        = report.user_id.as_str().to_owned();
    let user_name      = report.user_name.clone();
    let student_number = report.student_number.clone();
    let media          = encode_media(&report.media_urls)?;
    let status_str     = report.status.as_str();
    let status_rank    = report.status.rank();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO incident_reports (
             id, incident_type, location_details, detailed_description,
             report_date_time, user_id, user_name, student_number,
             media_urls, status, status_rank
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            type_str,
            location,
            description,
            reported_at,
            user_id,
            user_name,
            student_number,
            media,
            status_str,
            status_rank,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.feed.publish(Change::ReportFiled(report));
    Ok(())
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REPORT_COLUMNS} FROM incident_reports WHERE id = ?1"),
              rusqlite::params![id_str],
              RawReport::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn list_reports(&self, filter: ReportFilter) -> Result<Vec<IncidentReport>> {
    let user_id = filter.user_id.map(|u| u.as_str().to_owned());

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM incident_reports
           WHERE ?1 IS NULL OR user_id = ?1
           ORDER BY report_date_time DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawReport::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn advance_status(
    &self,
    id: Uuid,
    target: ReportStatus,
  ) -> Result<Option<(IncidentReport, Transition)>> {
    let id_str      = encode_uuid(id);
    let target_str  = target.as_str();
    let target_rank = target.rank();

    // Returns the row as stored afterwards, the status it held before, and
    // whether the conditional update fired.
    let outcome: Option<(RawReport, String, bool)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let before: Option<String> = tx
          .query_row(
            "SELECT status FROM incident_reports WHERE id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(before) = before else {
          return Ok(None);
        };

        let n = tx.execute(
          "UPDATE incident_reports SET status = ?2, status_rank = ?3
           WHERE id = ?1 AND status_rank < ?3",
          rusqlite::params![id_str, target_str, target_rank],
        )?;

        let raw = tx.query_row(
          &format!("SELECT {REPORT_COLUMNS} FROM incident_reports WHERE id = ?1"),
          rusqlite::params![id_str],
          RawReport::from_row,
        )?;
        tx.commit()?;
        Ok(Some((raw, before, n == 1)))
      })
      .await?;

    let Some((raw, before, applied)) = outcome else {
      return Ok(None);
    };
    let report = raw.into_report()?;
    let transition = if applied {
      Transition::Applied { from: before.parse()?, to: report.status }
    } else {
      Transition::Unchanged { current: report.status }
    };

    if applied {
      self.feed.publish(Change::StatusChanged(report.clone()));
    }
    Ok(Some((report, transition)))
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  fn changes(&self) -> broadcast::Receiver<Change> { self.feed.subscribe() }
}
