//! Async HTTP client wrapping the Beacon JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use beacon_core::{
  lifecycle::ReportStatus,
  profile::{ProfileUpdate, UserProfile},
  report::{IncidentReport, IncidentType},
};
use futures_util::StreamExt as _;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::sse::{SseEvent, SseParser};

/// Connection settings for the Beacon API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub token:    Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
  pub token:     String,
  pub user_id:   String,
  pub user_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
  #[serde(flatten)]
  pub profile:        UserProfile,
  pub setup_required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotline {
  pub name:          String,
  pub phone_number:  String,
  pub incident_type: Option<IncidentType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
  pub email:          String,
  pub password:       String,
  pub full_name:      String,
  pub user_type:      String,
  pub student_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReportBody {
  pub incident_type:        IncidentType,
  pub location_details:     String,
  pub detailed_description: String,
}

/// Async HTTP client for the Beacon JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

/// Turn a non-success response into an error carrying the server's message
/// and any per-field validation messages.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body: Value = resp.json().await.unwrap_or(Value::Null);
  let mut message = body["error"]
    .as_str()
    .map_or_else(|| status.to_string(), str::to_owned);
  if let Some(fields) = body["fields"].as_object() {
    for (field, msgs) in fields {
      for m in msgs.as_array().into_iter().flatten() {
        message.push_str(&format!("\n  {field}: {}", m.as_str().unwrap_or_default()));
      }
    }
  }
  Err(anyhow!("{what} → {status}: {message}"))
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
    tracing::debug!(path, "GET");
    let resp = self
      .auth(self.client.get(self.url(path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    check(resp, &format!("GET {path}"))
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {path}"))
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  /// `POST /api/auth/register`
  pub async fn register(&self, account: &NewAccount) -> Result<UserProfile> {
    let resp = self
      .client
      .post(self.url("/auth/register"))
      .json(account)
      .send()
      .await
      .context("POST /auth/register failed")?;
    check(resp, "register").await?.json().await.context("deserialising profile")
  }

  /// `POST /api/auth/login`
  pub async fn login(&self, email: &str, password: &str) -> Result<Login> {
    let resp = self
      .client
      .post(self.url("/auth/login"))
      .basic_auth(email, Some(password))
      .send()
      .await
      .context("POST /auth/login failed")?;
    check(resp, "login").await?.json().await.context("deserialising login")
  }

  /// `POST /api/auth/logout`
  pub async fn logout(&self) -> Result<()> {
    let resp = self
      .auth(self.client.post(self.url("/auth/logout")))
      .send()
      .await
      .context("POST /auth/logout failed")?;
    check(resp, "logout").await?;
    Ok(())
  }

  /// `GET /api/me`
  pub async fn me(&self) -> Result<Me> { self.get("/me").await }

  /// `PATCH /api/me/profile`
  pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
    let resp = self
      .auth(self.client.patch(self.url("/me/profile")))
      .json(update)
      .send()
      .await
      .context("PATCH /me/profile failed")?;
    check(resp, "profile update").await?;
    Ok(())
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// `POST /api/reports`
  pub async fn submit(&self, report: &NewReportBody) -> Result<IncidentReport> {
    let resp = self
      .auth(self.client.post(self.url("/reports")))
      .json(report)
      .send()
      .await
      .context("POST /reports failed")?;
    check(resp, "report").await?.json().await.context("deserialising report")
  }

  /// `GET /api/reports?scope=…[&limit=n]`
  pub async fn reports(&self, all: bool, limit: Option<usize>) -> Result<Vec<IncidentReport>> {
    let scope = if all { "all" } else { "own" };
    let mut query = vec![("scope", scope.to_string())];
    if let Some(n) = limit {
      query.push(("limit", n.to_string()));
    }
    let resp = self
      .auth(self.client.get(self.url("/reports")))
      .query(&query)
      .send()
      .await
      .context("GET /reports failed")?;
    check(resp, "GET /reports").await?.json().await.context("deserialising reports")
  }

  /// `GET /api/reports/{id}`
  pub async fn report(&self, id: Uuid) -> Result<IncidentReport> {
    self.get(&format!("/reports/{id}")).await
  }

  /// `POST /api/reports/{id}/status`
  pub async fn set_status(&self, id: Uuid, status: ReportStatus) -> Result<()> {
    let resp = self
      .auth(self.client.post(self.url(&format!("/reports/{id}/status"))))
      .json(&json!({ "status": status }))
      .send()
      .await
      .with_context(|| format!("POST /reports/{id}/status failed"))?;
    check(resp, "status change").await?;
    Ok(())
  }

  // ── Directory ─────────────────────────────────────────────────────────────

  /// `GET /api/admin/users`
  pub async fn users(&self) -> Result<Vec<UserProfile>> { self.get("/admin/users").await }

  /// `GET /api/hotlines`
  pub async fn hotlines(&self) -> Result<Vec<Hotline>> { self.get("/hotlines").await }

  // ── Streams ───────────────────────────────────────────────────────────────

  /// Follow an event stream, calling `on_event` for each event until the
  /// server closes it or `on_event` returns `false`.
  pub async fn follow(
    &self,
    path: &str,
    mut on_event: impl FnMut(SseEvent) -> Result<bool>,
  ) -> Result<()> {
    let resp = self
      .auth(self.client.get(self.url(path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    let mut body = check(resp, &format!("GET {path}")).await?.bytes_stream();

    let mut parser = SseParser::default();
    while let Some(chunk) = body.next().await {
      let chunk = chunk.context("reading event stream")?;
      for event in parser.push(&chunk) {
        if !on_event(event)? {
          return Ok(());
        }
      }
    }
    Ok(())
  }
}
