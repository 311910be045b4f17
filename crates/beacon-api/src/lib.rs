//! JSON REST and Server-Sent-Events API for Beacon.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`IncidentStore`] and [`IdentityProvider`]. Requests carry a bearer token
//! issued by `POST /auth/login`; every operation runs through
//! [`Reporting`], so authorization and validation live in one place.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", beacon_api::api_router(state))
//! ```

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod error;
pub mod reports;
pub mod watch;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use beacon_core::{identity::IdentityProvider, service::Reporting, store::IncidentStore};

pub use error::ApiError;

/// Everything a backend must provide to serve the API.
pub trait Backend: IncidentStore + IdentityProvider + 'static {}

impl<T> Backend for T where T: IncidentStore + IdentityProvider + 'static {}

/// Knobs the router needs from the server configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
  /// Whether `POST /auth/register` may create administrators.
  pub allow_admin_registration: bool,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub reporting: Reporting<S>,
  pub identity:  Arc<S>,
  pub settings:  Arc<ApiSettings>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      reporting: self.reporting.clone(),
      identity:  self.identity.clone(),
      settings:  self.settings.clone(),
    }
  }
}

impl<S: Backend> AppState<S> {
  /// Build state over one backend serving both roles.
  pub fn new(reporting: Reporting<S>, settings: ApiSettings) -> Self {
    Self {
      identity: reporting.store().clone(),
      reporting,
      settings: Arc::new(settings),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Accounts
    .route("/auth/register", post(accounts::register::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/logout", post(accounts::logout::<S>))
    .route("/me", get(accounts::me::<S>))
    .route("/me/profile", patch(accounts::update_profile::<S>))
    // Reports
    .route("/reports", get(reports::list::<S>).post(reports::create::<S>))
    .route("/reports/watch", get(watch::reports::<S>))
    .route("/reports/{id}", get(reports::get_one::<S>))
    .route("/reports/{id}/status", post(reports::change_status::<S>))
    .route("/reports/{id}/watch", get(watch::report::<S>))
    .route("/notices", get(watch::notices::<S>))
    // Administration and reference data
    .route("/admin/users", get(admin::users::<S>))
    .route("/hotlines", get(admin::hotlines))
    .with_state(state)
}

#[cfg(test)]
mod tests;
