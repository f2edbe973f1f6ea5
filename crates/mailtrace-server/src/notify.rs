//! Best-effort webhook notifications for recorded events.
//!
//! Handlers enqueue a [`Notification`] without awaiting delivery. A single
//! worker task drains the bounded queue and POSTs each payload as JSON with
//! the shared secret in `X-Shared-Secret`. Nothing is retried: a full queue,
//! a transport error, a timeout or a non-2xx status is logged and the
//! notification is dropped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mailtrace_core::{
  email::Email,
  event::{Event, EventKind},
};
use reqwest::Client;
use serde::Serialize;
use tokio::{
  sync::mpsc::{self, error::TrySendError},
  task::JoinHandle,
};

pub const QUEUE_CAPACITY: usize = 256;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
pub const SECRET_HEADER: &str = "x-shared-secret";

/// Where notifications are delivered.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
  pub url:    String,
  pub secret: String,
}

/// JSON payload posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub event_type: EventKind,
  pub email_id:   String,
  #[serde(with = "mailtrace_core::timestamp")]
  pub timestamp:  DateTime<Utc>,
  pub ip:         String,
  pub user_agent: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub click_url:  Option<String>,
  /// `None` when the email id is unknown.
  pub subject:    Option<String>,
  pub recipient:  Option<String>,
}

impl Notification {
  pub fn for_event(event: &Event, email: Option<&Email>, click_url: Option<String>) -> Self {
    Self {
      event_type: event.kind,
      email_id: event.email_id.clone(),
      timestamp: event.timestamp,
      ip: event.ip.clone().unwrap_or_default(),
      user_agent: event.user_agent.clone().unwrap_or_default(),
      click_url,
      subject: email.map(|e| e.subject.clone()),
      recipient: email.map(|e| e.recipient.clone()),
    }
  }
}

/// Handle used by request handlers to enqueue notifications.
///
/// Cheap to clone. A disabled notifier silently discards everything.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
  tx: Option<mpsc::Sender<Notification>>,
}

impl Notifier {
  pub fn disabled() -> Self { Self { tx: None } }

  /// Start the delivery worker and return a handle to its queue.
  pub fn spawn(config: WebhookConfig) -> reqwest::Result<(Self, JoinHandle<()>)> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let (notifier, rx) = Self::queue(QUEUE_CAPACITY);
    let worker = tokio::spawn(run(client, config, rx));
    Ok((notifier, worker))
  }

  fn queue(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Self { tx: Some(tx) }, rx)
  }

  pub fn is_enabled(&self) -> bool { self.tx.is_some() }

  /// Enqueue without waiting. Never fails the caller.
  pub fn notify(&self, notification: Notification) {
    let Some(tx) = &self.tx else {
      return;
    };
    match tx.try_send(notification) {
      Ok(()) => {}
      Err(TrySendError::Full(n)) => {
        tracing::warn!(email_id = %n.email_id, event = %n.event_type, "notification queue full, dropping");
      }
      Err(TrySendError::Closed(n)) => {
        tracing::warn!(email_id = %n.email_id, event = %n.event_type, "notifier stopped, dropping");
      }
    }
  }
}

async fn run(client: Client, config: WebhookConfig, mut rx: mpsc::Receiver<Notification>) {
  while let Some(notification) = rx.recv().await {
    deliver(&client, &config, &notification).await;
  }
  tracing::debug!("notification queue closed");
}

async fn deliver(client: &Client, config: &WebhookConfig, notification: &Notification) {
  let result = client
    .post(&config.url)
    .header(SECRET_HEADER, &config.secret)
    .json(notification)
    .send()
    .await;

  match result {
    Ok(resp) if resp.status().is_success() => {
      tracing::debug!(email_id = %notification.email_id, "notification delivered");
    }
    Ok(resp) => {
      tracing::warn!(
        email_id = %notification.email_id,
        status = %resp.status(),
        "webhook rejected notification"
      );
    }
    Err(e) => {
      tracing::warn!(email_id = %notification.email_id, error = %e, "webhook notify failed");
    }
  }
}
