//! Server configuration: an optional TOML file layered under `BEACON_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                     String,
  #[serde(default = "default_port")]
  pub port:                     u16,
  #[serde(default = "default_store_path")]
  pub store_path:               PathBuf,
  /// Whether anyone may self-register as an administrator.
  #[serde(default)]
  pub allow_admin_registration: bool,
  /// When both are set, an administrator with these credentials is created
  /// at startup unless one already exists.
  #[serde(default)]
  pub bootstrap_admin_email:    Option<String>,
  #[serde(default)]
  pub bootstrap_admin_password: Option<String>,
  /// Changes buffered per live view before it lags and resyncs.
  #[serde(default = "default_feed_capacity")]
  pub feed_capacity:            usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/beacon/beacon.db") }

fn default_feed_capacity() -> usize { beacon_core::feed::DEFAULT_CAPACITY }

impl ServerConfig {
  /// Read `path` (if it exists) and then the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BEACON"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  /// The bootstrap administrator credentials, if fully configured.
  pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
    match (&self.bootstrap_admin_email, &self.bootstrap_admin_password) {
      (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
        Some((email, password))
      }
      _ => None,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
