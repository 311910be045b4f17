//! beacon-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `BEACON_*` environment variables, opens the SQLite store, and serves the
//! JSON API under `/api`.
//!
//! # Creating an administrator
//!
//! Self-registration as an administrator is off by default. Create one from
//! the command line (password read from stdin):
//!
//! ```
//! cargo run -p beacon-server -- --create-admin dean@campus.ac.za
//! ```

mod bootstrap;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use beacon_api::{ApiSettings, AppState};
use beacon_core::{notice::Notifier, service::Reporting};
use beacon_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Beacon campus incident server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an administrator with this email (password read from stdin)
  /// and exit.
  #[arg(long, value_name = "EMAIL")]
  create_admin: Option<String>,

  /// Display name for `--create-admin`.
  #[arg(long, default_value = bootstrap::DEFAULT_ADMIN_NAME)]
  admin_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_feed_capacity(server_cfg.feed_capacity);

  // Build application state.
  let reporting = Reporting::new(Arc::new(store), Notifier::new(server_cfg.feed_capacity));
  let state = AppState::new(reporting, ApiSettings {
    allow_admin_registration: server_cfg.allow_admin_registration,
  });

  // Helper mode: create an administrator and exit.
  if let Some(email) = cli.create_admin {
    let password = read_password()?;
    let profile = bootstrap::create_admin(&state, &email, &password, &cli.admin_name)
      .await
      .context("failed to create administrator")?;
    println!("created administrator {} ({})", profile.contact_name, profile.user_id);
    return Ok(());
  }

  if let Some((email, password)) = server_cfg.bootstrap_admin() {
    bootstrap::ensure_admin(&state, email, password).await?;
  }

  let app = Router::new()
    .nest("/api", beacon_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
