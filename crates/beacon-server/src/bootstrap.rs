//! Creating administrators outside of self-registration.

use beacon_api::{ApiError, AppState, Backend, accounts::register_user};
use beacon_core::{
  profile::{Registration, UserProfile, UserType},
  store::IncidentStore,
};

pub const DEFAULT_ADMIN_NAME: &str = "Campus Administrator";

/// Register an administrator account and profile.
pub async fn create_admin<S: Backend>(
  state: &AppState<S>,
  email: &str,
  password: &str,
  name: &str,
) -> Result<UserProfile, ApiError> {
  let registration = Registration {
    email:          email.to_owned(),
    password:       password.to_owned(),
    full_name:      name.to_owned(),
    user_type:      UserType::Admin,
    student_number: None,
  };
  register_user(state, registration, true).await
}

/// Create the configured administrator unless some administrator already
/// exists. An already-registered email is logged and left alone.
pub async fn ensure_admin<S: Backend>(
  state: &AppState<S>,
  email: &str,
  password: &str,
) -> anyhow::Result<()> {
  let profiles = state
    .reporting
    .store()
    .list_profiles()
    .await
    .map_err(|e| anyhow::anyhow!("failed to list profiles: {e}"))?;
  if profiles.iter().any(UserProfile::is_admin) {
    return Ok(());
  }

  match create_admin(state, email, password, DEFAULT_ADMIN_NAME).await {
    Ok(profile) => {
      tracing::info!(user_id = %profile.user_id, email, "bootstrap administrator created");
      Ok(())
    }
    Err(ApiError::Conflict(_)) => {
      tracing::warn!(email, "bootstrap administrator email already registered; skipping");
      Ok(())
    }
    Err(e) => Err(anyhow::anyhow!("failed to create bootstrap administrator: {e}")),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use beacon_api::ApiSettings;
  use beacon_core::{notice::Notifier, service::Reporting};
  use beacon_store_sqlite::SqliteStore;

  use super::*;

  async fn state() -> AppState<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    AppState::new(Reporting::new(store, Notifier::default()), ApiSettings::default())
  }

  async fn admin_count(state: &AppState<SqliteStore>) -> usize {
    let profiles = state.reporting.store().list_profiles().await.unwrap();
    profiles.iter().filter(|p| p.is_admin()).count()
  }

  #[tokio::test]
  async fn bootstrap_creates_one_admin() {
    let state = state().await;
    ensure_admin(&state, "dean@campus.ac.za", "change-me").await.unwrap();
    ensure_admin(&state, "dean@campus.ac.za", "change-me").await.unwrap();
    assert_eq!(admin_count(&state).await, 1);
  }

  #[tokio::test]
  async fn bootstrap_skips_when_an_admin_exists() {
    let state = state().await;
    create_admin(&state, "first@campus.ac.za", "change-me", "First").await.unwrap();
    ensure_admin(&state, "second@campus.ac.za", "change-me").await.unwrap();
    assert_eq!(admin_count(&state).await, 1);
  }

  #[tokio::test]
  async fn created_admin_has_no_student_number() {
    let state = state().await;
    let profile = create_admin(&state, "dean@campus.ac.za", "change-me", "Dean")
      .await
      .unwrap();
    assert!(profile.is_admin());
    assert!(profile.student_number.is_none());
  }
}
