//! Router tests against an in-memory SQLite backend.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use beacon_core::{
  UserId,
  feed::Change,
  identity::IdentityProvider,
  lifecycle::{ReportStatus, Transition},
  notice::Notifier,
  profile::{ProfileUpdate, Registration, UserProfile, UserType},
  report::IncidentReport,
  service::Reporting,
  store::{IncidentStore, ReportFilter},
};
use beacon_store_sqlite::{Error as StoreError, SqliteStore};
use futures_util::StreamExt as _;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiSettings, AppState, accounts::register_user, api_router};

async fn make_state(allow_admin_registration: bool) -> AppState<SqliteStore> {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let reporting = Reporting::new(store, Notifier::default());
  AppState::new(reporting, ApiSettings { allow_admin_registration })
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(t) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
  }
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

async fn login(state: &AppState<SqliteStore>, email: &str, password: &str) -> (StatusCode, Value) {
  let req = Request::builder()
    .method("POST")
    .uri("/auth/login")
    .header(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode(format!("{email}:{password}"))),
    )
    .body(Body::empty())
    .unwrap();
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn student(state: &AppState<SqliteStore>, name: &str) -> String {
  let email = format!("{name}@campus.ac.za");
  let (status, _) = send(
    state,
    "POST",
    "/auth/register",
    None,
    Some(json!({
      "email": email,
      "password": "secret1",
      "fullName": format!("{name} Student"),
      "userType": "student",
      "studentNumber": "20240001",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let (_, body) = login(state, &email, "secret1").await;
  body["token"].as_str().unwrap().to_owned()
}

async fn admin(state: &AppState<SqliteStore>) -> String {
  let registration = Registration {
    email:          "dean@campus.ac.za".into(),
    password:       "secret1".into(),
    full_name:      "Campus Dean".into(),
    user_type:      UserType::Admin,
    student_number: None,
  };
  register_user(state, registration, true)
    .await
    .unwrap();
  let (_, body) = login(state, "dean@campus.ac.za", "secret1").await;
  body["token"].as_str().unwrap().to_owned()
}

fn fire() -> Value {
  json!({
    "incidentType": "Fire",
    "locationDetails": "Lab C-102 corridor",
    "detailedDescription": "Smoke visible near the fume hood.",
  })
}

/// Poll `uri` until `done` holds; background writes settle asynchronously.
async fn eventually(
  state: &AppState<SqliteStore>,
  uri: &str,
  token: &str,
  done: impl Fn(&Value) -> bool,
) -> Value {
  for _ in 0..200 {
    let (status, body) = send(state, "GET", uri, Some(token), None).await;
    if status == StatusCode::OK && done(&body) {
      return body;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("condition on {uri} never held");
}

async fn filed_report(state: &AppState<SqliteStore>, token: &str) -> String {
  let (status, body) = send(state, "POST", "/reports", Some(token), Some(fire())).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  let id = body["id"].as_str().unwrap().to_owned();
  eventually(state, &format!("/reports/{id}"), token, |_| true).await;
  id
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_and_me() {
  let state = make_state(false).await;
  let token = student(&state, "alice").await;

  let (status, me) = send(&state, "GET", "/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["contactName"], "alice Student");
  assert_eq!(me["userType"], "student");
  assert_eq!(me["studentNumber"], "20240001");
  assert_eq!(me["setupRequired"], true);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let state = make_state(false).await;
  student(&state, "alice").await;
  let (status, _) = login(&state, "alice@campus.ac.za", "nope").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
  let state = make_state(false).await;
  student(&state, "alice").await;
  let (status, _) = send(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({
      "email": "ALICE@campus.ac.za",
      "password": "secret1",
      "fullName": "Alice Again",
      "userType": "student",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_self_registration_is_gated() {
  let body = json!({
    "email": "boss@campus.ac.za",
    "password": "secret1",
    "fullName": "Big Boss",
    "userType": "admin",
  });

  let closed = make_state(false).await;
  let (status, _) = send(&closed, "POST", "/auth/register", None, Some(body.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let open = make_state(true).await;
  let (status, profile) = send(&open, "POST", "/auth/register", None, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(profile["userType"], "admin");
}

#[tokio::test]
async fn invalid_registration_lists_fields() {
  let state = make_state(false).await;
  let (status, body) = send(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "email": "not-an-email", "password": "123", "fullName": "A" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["fields"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn logout_revokes_token() {
  let state = make_state(false).await;
  let token = student(&state, "alice").await;

  let (status, _) = send(&state, "POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&state, "GET", "/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_is_merged() {
  let state = make_state(false).await;
  let token = student(&state, "alice").await;

  let (status, _) = send(
    &state,
    "PATCH",
    "/me/profile",
    Some(&token),
    Some(json!({
      "contactPhoneNumber": "0123456789",
      "emergencyContactName": "Mary Student",
      "emergencyContactPhoneNumber": "0987654321",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::ACCEPTED);

  let me = eventually(&state, "/me", &token, |me| me["setupRequired"] == false).await;
  assert_eq!(me["contactName"], "alice Student");
  assert_eq!(me["emergencyContactName"], "Mary Student");
}

#[tokio::test]
async fn short_phone_number_is_rejected() {
  let state = make_state(false).await;
  let token = student(&state, "alice").await;
  let (status, _) = send(
    &state,
    "PATCH",
    "/me/profile",
    Some(&token),
    Some(json!({ "contactPhoneNumber": "555" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fire_report_is_filed_as_new() {
  let state = make_state(false).await;
  let token = student(&state, "alice").await;
  let id = filed_report(&state, &token).await;

  let (status, report) = send(&state, "GET", &format!("/reports/{id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["incidentType"], "Fire");
  assert_eq!(report["status"], "New");
  assert_eq!(report["mediaUrls"], json!([]));
  assert_eq!(report["userName"], "alice Student");
  assert_eq!(report["studentNumber"], "20240001");
}

#[tokio::test]
async fn anonymous_submission_is_unauthorized() {
  let state = make_state(false).await;
  let (status, _) = send(&state, "POST", "/reports", None, Some(fire())).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = send(&state, "POST", "/reports", Some("bogus"), Some(fire())).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_report_names_fields() {
  let state = make_state(false).await;
  let token = student(&state, "alice").await;
  let (status, body) = send(
    &state,
    "POST",
    "/reports",
    Some(&token),
    Some(json!({ "incidentType": "Flood", "locationDetails": "Lab", "detailedDescription": "Smoke" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["fields"]["incidentType"].is_array());

  let (_, list) = send(&state, "GET", "/reports", Some(&token), None).await;
  assert_eq!(list, json!([]));
}

#[tokio::test]
async fn own_listing_is_scoped_and_limited() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let bob = student(&state, "bob").await;
  for _ in 0..3 {
    filed_report(&state, &alice).await;
  }
  filed_report(&state, &bob).await;

  let (_, mine) = send(&state, "GET", "/reports", Some(&alice), None).await;
  assert_eq!(mine.as_array().unwrap().len(), 3);

  let (_, recent) = send(&state, "GET", "/reports?limit=2", Some(&alice), None).await;
  assert_eq!(recent.as_array().unwrap().len(), 2);

  let (status, _) = send(&state, "GET", "/reports?scope=all", Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn detail_is_private_to_owner_and_admins() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let bob = student(&state, "bob").await;
  let dean = admin(&state).await;
  let id = filed_report(&state, &alice).await;
  let uri = format!("/reports/{id}");

  assert_eq!(send(&state, "GET", &uri, Some(&bob), None).await.0, StatusCode::FORBIDDEN);
  assert_eq!(send(&state, "GET", &uri, Some(&dean), None).await.0, StatusCode::OK);

  let missing = format!("/reports/{}", uuid::Uuid::new_v4());
  assert_eq!(send(&state, "GET", &missing, Some(&alice), None).await.0, StatusCode::NOT_FOUND);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn students_cannot_change_status() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let id = filed_report(&state, &alice).await;

  let (status, _) = send(
    &state,
    "POST",
    &format!("/reports/{id}/status"),
    Some(&alice),
    Some(json!({ "status": "Resolved" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, report) = send(&state, "GET", &format!("/reports/{id}"), Some(&alice), None).await;
  assert_eq!(report["status"], "New");
}

#[tokio::test]
async fn acknowledging_a_resolved_report_keeps_it_resolved() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let dean = admin(&state).await;
  let id = filed_report(&state, &alice).await;
  let status_uri = format!("/reports/{id}/status");
  let detail_uri = format!("/reports/{id}");

  let (status, _) =
    send(&state, "POST", &status_uri, Some(&dean), Some(json!({ "status": "Resolved" }))).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  eventually(&state, &detail_uri, &dean, |r| r["status"] == "Resolved").await;

  let (status, _) =
    send(&state, "POST", &status_uri, Some(&dean), Some(json!({ "status": "acknowledged" }))).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  tokio::time::sleep(Duration::from_millis(50)).await;

  let (_, report) = send(&state, "GET", &detail_uri, Some(&alice), None).await;
  assert_eq!(report["status"], "Resolved");
}

#[tokio::test]
async fn bad_targets_are_rejected() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let dean = admin(&state).await;
  let id = filed_report(&state, &alice).await;
  let uri = format!("/reports/{id}/status");

  let (status, _) = send(&state, "POST", &uri, Some(&dean), Some(json!({ "status": "New" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) =
    send(&state, "POST", &uri, Some(&dean), Some(json!({ "status": "Closed" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let missing = format!("/reports/{}/status", uuid::Uuid::new_v4());
  let (status, _) =
    send(&state, "POST", &missing, Some(&dean), Some(json!({ "status": "Resolved" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Administration ──────────────────────────────────────────────────────────

#[tokio::test]
async fn user_directory_is_admin_only() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let dean = admin(&state).await;

  let (status, users) = send(&state, "GET", "/admin/users", Some(&dean), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(users.as_array().unwrap().len(), 2);

  let (status, _) = send(&state, "GET", "/admin/users", Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn hotlines_need_no_token() {
  let state = make_state(false).await;
  let (status, lines) = send(&state, "GET", "/hotlines", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(lines.as_array().unwrap().len(), 8);
  assert_eq!(lines[0]["phoneNumber"], "013 002 0002");
}

// ─── Live views ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn watch_streams_initial_snapshot() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  filed_report(&state, &alice).await;

  let req = Request::builder()
    .uri("/reports/watch")
    .header(header::AUTHORIZATION, format!("Bearer {alice}"))
    .body(Body::empty())
    .unwrap();
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");

  let mut body = resp.into_body().into_data_stream();
  let chunk = body.next().await.unwrap().unwrap();
  let text = String::from_utf8_lossy(&chunk);
  assert!(text.contains("event: snapshot"), "{text}");
  assert!(text.contains("Lab C-102 corridor"), "{text}");
}

#[tokio::test]
async fn watching_everything_requires_admin() {
  let state = make_state(false).await;
  let alice = student(&state, "alice").await;
  let (status, _) = send(&state, "GET", "/reports/watch?scope=all", Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Registration rollback ───────────────────────────────────────────────────

/// SQLite backend whose profile inserts can be made to fail.
struct ProfileOutage {
  inner: SqliteStore,
  down:  AtomicBool,
}

impl IncidentStore for ProfileOutage {
  type Error = StoreError;

  async fn insert_profile(&self, profile: UserProfile) -> Result<bool, StoreError> {
    if self.down.load(Ordering::SeqCst) {
      return Err(beacon_core::Error::WriteAborted.into());
    }
    self.inner.insert_profile(profile).await
  }
  async fn merge_profile(
    &self,
    user_id: UserId,
    update: ProfileUpdate,
  ) -> Result<Option<UserProfile>, StoreError> {
    self.inner.merge_profile(user_id, update).await
  }
  async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
    self.inner.get_profile(user_id).await
  }
  async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
    self.inner.list_profiles().await
  }
  async fn insert_report(&self, report: IncidentReport) -> Result<(), StoreError> {
    self.inner.insert_report(report).await
  }
  async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>, StoreError> {
    self.inner.get_report(id).await
  }
  async fn list_reports(&self, filter: ReportFilter) -> Result<Vec<IncidentReport>, StoreError> {
    self.inner.list_reports(filter).await
  }
  async fn advance_status(
    &self,
    id: Uuid,
    target: ReportStatus,
  ) -> Result<Option<(IncidentReport, Transition)>, StoreError> {
    self.inner.advance_status(id, target).await
  }
  fn changes(&self) -> broadcast::Receiver<Change> { self.inner.changes() }
}

impl IdentityProvider for ProfileOutage {
  type Error = StoreError;

  async fn register_account(
    &self,
    email: String,
    password: String,
  ) -> Result<Option<UserId>, StoreError> {
    self.inner.register_account(email, password).await
  }
  async fn delete_account(&self, user_id: UserId) -> Result<bool, StoreError> {
    self.inner.delete_account(user_id).await
  }
  async fn authenticate(
    &self,
    email: String,
    password: String,
  ) -> Result<Option<UserId>, StoreError> {
    self.inner.authenticate(email, password).await
  }
  async fn open_session(&self, user_id: UserId) -> Result<String, StoreError> {
    self.inner.open_session(user_id).await
  }
  async fn resolve_session(&self, token: String) -> Result<Option<UserId>, StoreError> {
    self.inner.resolve_session(token).await
  }
  async fn close_session(&self, token: String) -> Result<bool, StoreError> {
    self.inner.close_session(token).await
  }
}

fn registration(email: &str) -> Registration {
  Registration {
    email:          email.into(),
    password:       "secret1".into(),
    full_name:      "Erin Student".into(),
    user_type:      UserType::Student,
    student_number: Some("20240002".into()),
  }
}

#[tokio::test]
async fn failed_profile_write_releases_the_email() {
  let backend = Arc::new(ProfileOutage {
    inner: SqliteStore::open_in_memory().await.unwrap(),
    down:  AtomicBool::new(true),
  });
  let state = AppState::new(
    Reporting::new(backend.clone(), Notifier::default()),
    ApiSettings::default(),
  );

  let failed = register_user(&state, registration("erin@campus.ac.za"), false).await;
  assert!(failed.is_err());
  let orphan = backend
    .authenticate("erin@campus.ac.za".into(), "secret1".into())
    .await
    .unwrap();
  assert!(orphan.is_none());

  backend.down.store(false, Ordering::SeqCst);
  let profile = register_user(&state, registration("erin@campus.ac.za"), false)
    .await
    .unwrap();
  let signed_in = backend
    .authenticate("erin@campus.ac.za".into(), "secret1".into())
    .await
    .unwrap();
  assert_eq!(signed_in, Some(profile.user_id));
}
