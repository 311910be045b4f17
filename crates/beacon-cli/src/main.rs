//! `beacon` — command-line client for the Beacon incident service.
//!
//! # Usage
//!
//! ```
//! beacon login --email thandi@campus.ac.za --save
//! beacon report --type medical --location "Library, 2nd floor" --description "Student fainted near the stairs"
//! beacon reports --all --limit 20
//! beacon watch --all
//! ```
//!
//! Connection settings come from flags, then `BEACON_URL` / `BEACON_TOKEN`,
//! then `~/.config/beacon/config.toml`.

mod client;
mod output;
mod sse;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use beacon_core::{
  hotline,
  lifecycle::ReportStatus,
  profile::ProfileUpdate,
  report::{IncidentType, coordinates_as_location},
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig, NewAccount, NewReportBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beacon", about = "Report and follow campus incidents")]
struct Args {
  /// Path to a TOML config file (url, token).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Base URL of the beacon server (default: http://localhost:8080).
  #[arg(long, env = "BEACON_URL", global = true)]
  url: Option<String>,

  /// Session token from `beacon login`.
  #[arg(long, env = "BEACON_TOKEN", global = true, hide_env_values = true)]
  token: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an account.
  Register {
    #[arg(long)]
    email:          String,
    /// Full name, used as the contact name.
    #[arg(long)]
    name:           String,
    #[arg(long)]
    student_number: Option<String>,
    /// Register as an administrator (only if the server allows it).
    #[arg(long)]
    admin:          bool,
    /// Read from stdin when omitted.
    #[arg(long)]
    password:       Option<String>,
  },
  /// Sign in and print (or save) a session token.
  Login {
    #[arg(long)]
    email:    String,
    /// Read from stdin when omitted.
    #[arg(long)]
    password: Option<String>,
    /// Write the token to the config file.
    #[arg(long)]
    save:     bool,
  },
  /// Revoke the current session token.
  Logout,
  /// Show your profile.
  Me,
  /// Update your profile. Only the given fields change.
  Profile(ProfileArgs),
  /// File an incident report.
  Report(ReportArgs),
  /// List reports, newest first.
  Reports {
    /// Every report (administrators only).
    #[arg(long)]
    all:   bool,
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Show one report.
  Show { id: Uuid },
  /// Mark a report acknowledged (administrators only).
  Ack { id: Uuid },
  /// Mark a report resolved (administrators only).
  Resolve { id: Uuid },
  /// List every user profile (administrators only).
  Users,
  /// Campus and public emergency numbers.
  Hotlines,
  /// Follow reports live. Prints a fresh listing on every change.
  Watch {
    /// Follow a single report instead of a listing.
    id:  Option<Uuid>,
    /// Every report (administrators only).
    #[arg(long, conflicts_with = "id")]
    all: bool,
  },
  /// Follow failure notices for your background writes.
  Notices,
}

#[derive(ClapArgs, Debug)]
struct ProfileArgs {
  #[arg(long)]
  name:            Option<String>,
  #[arg(long)]
  phone:           Option<String>,
  #[arg(long)]
  emergency_name:  Option<String>,
  #[arg(long)]
  emergency_phone: Option<String>,
  #[arg(long)]
  medical:         Option<String>,
}

#[derive(ClapArgs, Debug)]
struct ReportArgs {
  /// fire, medical, gbv, bullying or crime.
  #[arg(long = "type", value_name = "TYPE")]
  incident_type: IncidentType,
  /// Where it happened.
  #[arg(long, required_unless_present = "lat", conflicts_with_all = ["lat", "lon"])]
  location:      Option<String>,
  /// Latitude of the current position, used in place of `--location`.
  #[arg(long, requires = "lon", allow_negative_numbers = true)]
  lat:           Option<f64>,
  #[arg(long, requires = "lat", allow_negative_numbers = true)]
  lon:           Option<f64>,
  #[arg(long)]
  description:   String,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Serialize, Deserialize, Default)]
struct ConfigFile {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  url:   String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  token: String,
}

impl ConfigFile {
  fn read(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Ok(Self::default());
    }
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")
  }

  fn write(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("creating {}", parent.display()))?;
    }
    let raw = toml::to_string(self).context("serialising config file")?;
    std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
  }
}

fn default_config_path() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_default()
    .join(".config/beacon/config.toml")
}

/// Read a password line from stdin.
fn read_password() -> Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let config_path = args.config.clone().unwrap_or_else(default_config_path);
  let mut file_cfg = ConfigFile::read(&config_path)?;

  // CLI flags and environment override the config file, which overrides
  // defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    token:    args
      .token
      .or_else(|| (!file_cfg.token.is_empty()).then(|| file_cfg.token.clone())),
  };
  let signed_in = api_config.token.is_some();
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Register { email, name, student_number, admin, password } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      let account = NewAccount {
        email,
        password,
        full_name: name,
        user_type: if admin { "admin" } else { "student" }.to_string(),
        student_number,
      };
      let profile = client.register(&account).await?;
      println!("registered {} ({})", profile.contact_name, profile.user_id);
      println!("sign in with `beacon login --email {}`", account.email);
    }

    Command::Login { email, password, save } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      let login = client.login(&email, &password).await?;
      tracing::debug!(user_id = %login.user_id, user_type = %login.user_type, "signed in");
      if save {
        file_cfg.token = login.token;
        file_cfg.write(&config_path)?;
        println!("signed in as {email}; token saved to {}", config_path.display());
      } else {
        println!("{}", login.token);
      }
    }

    Command::Logout => {
      if !signed_in {
        bail!("not signed in");
      }
      client.logout().await?;
      if !file_cfg.token.is_empty() {
        file_cfg.token.clear();
        file_cfg.write(&config_path)?;
      }
      println!("signed out");
    }

    Command::Me => output::me(&client.me().await?),

    Command::Profile(p) => {
      let update = ProfileUpdate {
        contact_name:                   p.name,
        contact_phone_number:           p.phone,
        emergency_contact_name:         p.emergency_name,
        emergency_contact_phone_number: p.emergency_phone,
        medical_information:            p.medical,
      };
      if update.is_empty() {
        bail!("nothing to update; pass at least one field");
      }
      client.update_profile(&update).await?;
      println!("profile update accepted");
    }

    Command::Report(r) => {
      let location_details = match (r.location, r.lat, r.lon) {
        (Some(location), ..) => location,
        (None, Some(lat), Some(lon)) => coordinates_as_location(lat, lon),
        _ => bail!("pass --location or both --lat and --lon"),
      };
      let body = NewReportBody {
        incident_type: r.incident_type,
        location_details,
        detailed_description: r.description,
      };
      let report = client.submit(&body).await?;
      println!("report {} accepted", report.id);
      let line = hotline::campus_line(report.incident_type);
      println!("for immediate help call {} on {}", line.name, line.phone_number);
    }

    Command::Reports { all, limit } => output::reports(&client.reports(all, limit).await?),

    Command::Show { id } => output::report(&client.report(id).await?),

    Command::Ack { id } => {
      client.set_status(id, ReportStatus::Acknowledged).await?;
      println!("{id}: acknowledgement requested");
    }

    Command::Resolve { id } => {
      client.set_status(id, ReportStatus::Resolved).await?;
      println!("{id}: resolution requested");
    }

    Command::Users => output::users(&client.users().await?),

    Command::Hotlines => output::hotlines(&client.hotlines().await?),

    Command::Watch { id, all } => {
      let path = match (id, all) {
        (Some(id), _) => format!("/reports/{id}/watch"),
        (None, true) => "/reports/watch?scope=all".to_string(),
        (None, false) => "/reports/watch?scope=own".to_string(),
      };
      client
        .follow(&path, |event| {
          let data: Value = serde_json::from_str(&event.data).unwrap_or(Value::Null);
          match event.event.as_str() {
            "snapshot" => output::snapshot(&data)?,
            "error" => bail!("stream error: {}", event.data),
            other => tracing::debug!(event = other, "ignoring event"),
          }
          Ok(true)
        })
        .await?;
    }

    Command::Notices => {
      client
        .follow("/notices", |event| {
          if event.event == "notice" {
            let data: Value = serde_json::from_str(&event.data).unwrap_or(Value::Null);
            output::notice(&data);
          }
          Ok(true)
        })
        .await?;
    }
  }

  Ok(())
}
