//! Records pixel and click hits.
//!
//! Store failures never reach the mail client: an open still gets its pixel
//! and a click still gets its redirect. Failures are logged instead.

use chrono::{DateTime, Utc};
use mailtrace_core::{
  debounce::Decision,
  email::Email,
  event::{Event, EventKind, NewEvent},
  store::TrackingStore,
};

use crate::{AppState, client::ClientInfo, notify::Notification, urls};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
  Recorded(Event),
  /// Inside the debounce window; nothing was stored.
  Suppressed,
  /// The event could not be stored. Already logged.
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
  Redirect(String),
  /// The decoded target is not an http(s) URL.
  InvalidTarget(String),
}

/// Look up an email, treating a store failure like an unknown id.
pub async fn lookup_email<S>(state: &AppState<S>, id: &str) -> Option<Email>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  match state.store.get_email(id).await {
    Ok(email) => email,
    Err(e) => {
      tracing::warn!(email_id = id, error = %e, "email lookup failed");
      None
    }
  }
}

async fn store_event<S>(
  state: &AppState<S>,
  id: &str,
  kind: EventKind,
  client: ClientInfo,
  now: DateTime<Utc>,
) -> Option<Event>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let mut input = NewEvent::new(id, kind, now);
  input.ip = client.ip;
  input.user_agent = client.user_agent;

  match state.store.record_event(input).await {
    Ok(event) => Some(event),
    Err(e) => {
      tracing::error!(email_id = id, event = %kind, error = %e, "failed to record event");
      None
    }
  }
}

pub async fn record_open<S>(
  state: &AppState<S>,
  id: &str,
  client: ClientInfo,
  now: DateTime<Utc>,
) -> OpenOutcome
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let email = lookup_email(state, id).await;

  let sent_at = email.as_ref().map(|e| e.sent_at);
  if let Decision::Suppress { elapsed } = state.debounce.check(sent_at, now) {
    tracing::debug!(email_id = id, elapsed_ms = elapsed.num_milliseconds(), "open debounced");
    return OpenOutcome::Suppressed;
  }

  let Some(event) = store_event(state, id, EventKind::Open, client, now).await else {
    return OpenOutcome::Failed;
  };
  state
    .notifier
    .notify(Notification::for_event(&event, email.as_ref(), None));
  OpenOutcome::Recorded(event)
}

/// Record a click on `raw_url` and decide where to send the client.
///
/// The event is stored before the target is validated, so a rejected target
/// still shows up in the event log.
pub async fn record_click<S>(
  state: &AppState<S>,
  id: &str,
  raw_url: &str,
  client: ClientInfo,
  now: DateTime<Utc>,
) -> ClickOutcome
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let target = urls::decode_component(raw_url);

  if let Some(event) = store_event(state, id, EventKind::Click, client, now).await {
    let email = lookup_email(state, id).await;
    state.notifier.notify(Notification::for_event(
      &event,
      email.as_ref(),
      Some(target.clone()),
    ));
  }

  if urls::is_http_url(&target) {
    ClickOutcome::Redirect(target)
  } else {
    tracing::debug!(email_id = id, target = %target, "rejected click target");
    ClickOutcome::InvalidTarget(target)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeDelta, TimeZone};
  use mailtrace_core::debounce::OpenDebounce;
  use mailtrace_store_sqlite::SqliteStore;

  use crate::{ServerConfig, notify::Notifier};

  fn sent() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap() }

  async fn state(window_secs: u64) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .insert_email(Email {
        id:        "m-1".into(),
        subject:   "Hello".into(),
        recipient: "a@example.com".into(),
        sent_at:   sent(),
      })
      .await
      .unwrap();
    let mut state = AppState::new(store, ServerConfig::default(), Notifier::disabled());
    state.debounce = OpenDebounce::from_secs(window_secs);
    state
  }

  fn client() -> ClientInfo {
    ClientInfo {
      ip:         Some("203.0.113.9".into()),
      user_agent: Some("Mozilla/5.0".into()),
    }
  }

  #[tokio::test]
  async fn opens_inside_window_are_suppressed_then_recorded() {
    let state = state(5).await;

    let early = record_open(&state, "m-1", client(), sent() + TimeDelta::seconds(1)).await;
    let again = record_open(&state, "m-1", client(), sent() + TimeDelta::seconds(3)).await;
    assert_eq!(early, OpenOutcome::Suppressed);
    assert_eq!(again, OpenOutcome::Suppressed);
    assert!(state.store.events_for("m-1").await.unwrap().is_empty());

    let late = record_open(&state, "m-1", client(), sent() + TimeDelta::seconds(6)).await;
    let OpenOutcome::Recorded(event) = late else {
      panic!("expected a recorded open, got {late:?}");
    };
    assert_eq!(event.kind, EventKind::Open);
    assert_eq!(event.ip.as_deref(), Some("203.0.113.9"));
    assert_eq!(state.store.events_for("m-1").await.unwrap(), vec![event]);
  }

  #[tokio::test]
  async fn unknown_email_opens_are_recorded() {
    let state = state(3600).await;
    let outcome = record_open(&state, "ghost", ClientInfo::default(), sent()).await;
    assert!(matches!(outcome, OpenOutcome::Recorded(_)));
    assert_eq!(state.store.events_for("ghost").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn click_redirects_to_decoded_target() {
    let state = state(5).await;
    let outcome = record_click(
      &state,
      "m-1",
      "https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc",
      client(),
      sent(),
    )
    .await;
    assert_eq!(outcome, ClickOutcome::Redirect("https://example.com/a?b=c".into()));
  }

  #[tokio::test]
  async fn clicks_are_never_debounced() {
    let state = state(3600).await;
    record_click(&state, "m-1", "https://example.com", client(), sent()).await;
    record_click(&state, "m-1", "https://example.com", client(), sent()).await;
    assert_eq!(state.store.events_for("m-1").await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn invalid_target_is_rejected_but_still_recorded() {
    let state = state(5).await;
    let outcome = record_click(&state, "m-1", "javascript:alert(1)", client(), sent()).await;
    assert_eq!(outcome, ClickOutcome::InvalidTarget("javascript:alert(1)".into()));

    let events = state.store.events_for("m-1").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Click);
  }

  #[tokio::test]
  async fn empty_target_is_invalid() {
    let state = state(5).await;
    let outcome = record_click(&state, "m-1", "", client(), sent()).await;
    assert_eq!(outcome, ClickOutcome::InvalidTarget(String::new()));
  }
}
