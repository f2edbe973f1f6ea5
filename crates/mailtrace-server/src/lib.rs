//! HTTP layer for mailtrace.
//!
//! Exposes an axum [`Router`] serving the public tracking endpoints
//! (`/pixel`, `/click`) and the key-protected dashboard API under `/api`,
//! backed by any [`TrackingStore`].

pub mod auth;
pub mod client;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod recorder;
pub mod urls;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::{HeaderName, HeaderValue, Method, header},
  middleware,
  routing::get,
};
use mailtrace_core::{
  debounce::{DEFAULT_WINDOW_SECS, OpenDebounce},
  store::TrackingStore,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handlers::{emails, health, stats, tracking};
use notify::{Notifier, WebhookConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MAILTRACE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  /// Shared secret expected in `X-Api-Key`.
  pub api_key:               String,
  /// The only origin allowed by CORS.
  pub frontend_origin:       String,
  /// Notifications are disabled when unset or empty.
  pub webhook_url:           Option<String>,
  pub webhook_secret:        String,
  /// Overrides the origin derived from request headers.
  pub public_base_url:       Option<String>,
  pub open_debounce_seconds: u64,
  pub store_path:            PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_string(),
      port:                  5055,
      api_key:               "dev-123".to_string(),
      frontend_origin:       "http://127.0.0.1:4000".to_string(),
      webhook_url:           None,
      webhook_secret:        String::new(),
      public_base_url:       None,
      open_debounce_seconds: DEFAULT_WINDOW_SECS,
      store_path:            PathBuf::from("data.db"),
    }
  }
}

impl ServerConfig {
  pub fn webhook(&self) -> Option<WebhookConfig> {
    let url = self.webhook_url.as_deref().filter(|u| !u.is_empty())?;
    Some(WebhookConfig {
      url:    url.to_owned(),
      secret: self.webhook_secret.clone(),
    })
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: TrackingStore> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub notifier: Notifier,
  pub debounce: OpenDebounce,
}

impl<S: TrackingStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig, notifier: Notifier) -> Self {
    Self {
      store: Arc::new(store),
      debounce: OpenDebounce::from_secs(config.open_debounce_seconds),
      config: Arc::new(config),
      notifier,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the tracking service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let require_key = middleware::from_fn_with_state(state.config.clone(), auth::require_api_key);
  let cors = cors_layer(&state.config);

  Router::new()
    .route("/",                   get(health::root))
    .route("/pixel",              get(tracking::pixel::<S>))
    .route("/click",              get(tracking::click::<S>))
    .route("/api/health",         get(health::health))
    .route("/api/emails",         get(emails::list::<S>).post(emails::create::<S>))
    .route("/api/emails/summary", get(emails::summary::<S>))
    .route("/api/emails/{id}",    get(emails::get_one::<S>))
    .route("/api/stats",          get(stats::handler::<S>))
    // Innermost first: CORS answers preflights before the key check runs.
    .layer(require_key)
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
  let cors = CorsLayer::new()
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(auth::API_KEY_HEADER)]);

  match HeaderValue::from_str(&config.frontend_origin) {
    Ok(origin) => cors.allow_origin(origin),
    Err(e) => {
      tracing::warn!(origin = %config.frontend_origin, error = %e, "invalid frontend origin, CORS disabled");
      cors
    }
  }
}
