//! Plain-text rendering for terminal output.

use beacon_core::{profile::UserProfile, report::IncidentReport, view};
use chrono::Local;
use serde_json::Value;

use crate::client::{Hotline, Me};

const RULE: &str = "────────────────────────────────────────────────────────────";

pub fn report_line(r: &IncidentReport) -> String {
  let when = r.report_date_time.with_timezone(&Local).format("%Y-%m-%d %H:%M");
  format!(
    "{}  {when}  {:<8} {:<12} {}  ({})",
    r.id,
    r.incident_type.as_str(),
    r.status.as_str(),
    r.location_details,
    r.user_name,
  )
}

pub fn reports(list: &[IncidentReport]) {
  if list.is_empty() {
    println!("no reports");
    return;
  }
  for r in list {
    println!("{}", report_line(r));
  }
}

pub fn report(r: &IncidentReport) {
  let when = r.report_date_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
  println!("{RULE}");
  println!("{} report {}", r.incident_type, r.id);
  println!("{RULE}");
  println!("status      {}", r.status);
  println!("filed       {when}");
  println!("reporter    {} ({})", r.user_name, r.user_id);
  if !r.student_number.is_empty() {
    println!("student no. {}", r.student_number);
  }
  println!("location    {}", r.location_details);
  println!();
  println!("{}", r.detailed_description);
}

pub fn me(me: &Me) {
  profile(&me.profile);
  if me.setup_required {
    println!();
    println!("profile setup required: add a phone number and an emergency contact");
    println!("  beacon profile --phone … --emergency-name … --emergency-phone …");
  }
}

pub fn profile(p: &UserProfile) {
  let or_dash = |s: &str| if s.is_empty() { "-".to_owned() } else { s.to_owned() };
  println!("{} ({})", p.contact_name, p.user_type.as_str());
  println!("  user id           {}", p.user_id);
  if let Some(n) = &p.student_number {
    println!("  student number    {n}");
  }
  println!("  phone             {}", or_dash(&p.contact_phone_number));
  println!(
    "  emergency contact {} {}",
    or_dash(&p.emergency_contact_name),
    or_dash(&p.emergency_contact_phone_number),
  );
  if let Some(m) = &p.medical_information {
    println!("  medical           {m}");
  }
}

pub fn users(list: &[UserProfile]) {
  for p in list {
    println!(
      "{:<36}  {:<7}  {:<24}  {}",
      p.user_id,
      p.user_type.as_str(),
      p.contact_name,
      p.student_number.as_deref().unwrap_or("-"),
    );
  }
}

pub fn hotlines(list: &[Hotline]) {
  for h in list {
    let tag = h.incident_type.map(|t| format!("[{t}]")).unwrap_or_default();
    println!("{:<40} {:<16} {tag}", h.name, h.phone_number);
  }
}

/// Render one `snapshot` event: a list of reports, or a single-report lookup.
pub fn snapshot(data: &Value) -> anyhow::Result<()> {
  println!("{RULE}");
  match data {
    Value::Array(_) => {
      let list: Vec<IncidentReport> = serde_json::from_value(data.clone())?;
      reports(&view::recent(&list, list.len()));
    }
    _ => match data["kind"].as_str() {
      Some("found") => report(&serde_json::from_value(data["report"].clone())?),
      _ => println!("report not found"),
    },
  }
  Ok(())
}

pub fn notice(data: &Value) {
  println!(
    "{}  {} failed for {}: {}",
    data["at"].as_str().unwrap_or_default(),
    data["operation"].as_str().unwrap_or("write"),
    data["key"].as_str().unwrap_or_default(),
    data["message"].as_str().unwrap_or_default(),
  );
}
