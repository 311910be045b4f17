//! Server-Sent-Events endpoints for live views and write-failure notices.
//!
//! | Method | Path | Events |
//! |--------|------|--------|
//! | `GET`  | `/reports/watch` | `snapshot`: report list; `?scope=own\|all` |
//! | `GET`  | `/reports/{id}/watch` | `snapshot`: `{"kind":"found","report":…}` or `{"kind":"not_found"}` |
//! | `GET`  | `/notices` | `notice`: the caller's failed background writes |
//!
//! Closing the connection drops the underlying subscription.

use std::{convert::Infallible, time::Duration};

use axum::{
  extract::{Path, Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use beacon_core::{
  Error as CoreError, UserId,
  notice::Notice,
  view::{ReportQuery, Snapshot, Subscription},
};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{AppState, Backend, auth::Caller, error::ApiError, reports::ListParams};

const KEEP_ALIVE: Duration = Duration::from_secs(15);

fn snapshot_event(item: beacon_core::Result<Snapshot>) -> Event {
  match item {
    Ok(snapshot) => Event::default()
      .event("snapshot")
      .json_data(&snapshot)
      .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
    Err(e) => Event::default().event("error").data(e.to_string()),
  }
}

fn snapshots<S: Backend>(
  sub: Subscription<S>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
  stream::unfold(sub, |mut sub| async move {
    let item = sub.next().await?;
    Some((Ok(snapshot_event(item)), sub))
  })
}

/// `GET /reports/watch[?scope=own|all]`
pub async fn reports<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Query(params): Query<ListParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
  let query = params.scope.query(&caller)?;
  let sub = state.reporting.watch(caller.id(), query).await?;
  tracing::debug!(query = ?sub.query(), "view opened");
  Ok(Sse::new(snapshots(sub)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}

/// `GET /reports/{id}/watch`
pub async fn report<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
  let sub = state.reporting.watch(caller.id(), ReportQuery::Single(id)).await?;
  Ok(Sse::new(snapshots(sub)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}

fn notices_for(
  rx: broadcast::Receiver<Notice>,
  user_id: UserId,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
  stream::unfold((rx, user_id), |(mut rx, user_id)| async move {
    loop {
      match rx.recv().await {
        Ok(notice) if notice.user_id == user_id => {
          let event = Event::default()
            .event("notice")
            .json_data(&notice)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
          return Some((Ok(event), (rx, user_id)));
        }
        Ok(_) => {}
        Err(RecvError::Lagged(skipped)) => {
          tracing::debug!(skipped, user_id = %user_id, "notice stream lagged");
        }
        Err(RecvError::Closed) => return None,
      }
    }
  })
}

/// `GET /notices`
pub async fn notices<S: Backend>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
  let user_id = caller.0.ok_or(CoreError::Unauthenticated)?;
  let rx = state.reporting.notices().subscribe();
  Ok(Sse::new(notices_for(rx, user_id)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}
