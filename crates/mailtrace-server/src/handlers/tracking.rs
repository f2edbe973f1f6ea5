//! Public tracking endpoints hit by mail clients.

use axum::{
  extract::{Query, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use mailtrace_core::store::TrackingStore;
use serde::Deserialize;

use crate::{
  AppState,
  client::ClientInfo,
  recorder::{self, ClickOutcome, OpenOutcome},
  urls,
};

/// 1×1 transparent GIF.
pub const PIXEL_GIF: &[u8] = &[
  0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0xf0, 0x00, 0x00, 0xff, 0xff,
  0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
  0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

#[derive(Debug, Deserialize)]
pub struct PixelParams {
  pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClickParams {
  pub id:  Option<String>,
  pub url: Option<String>,
}

fn bad_request(msg: &'static str) -> Response { (StatusCode::BAD_REQUEST, msg).into_response() }

fn pixel_response() -> Response {
  (
    [
      (header::CONTENT_TYPE, "image/gif"),
      (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
      (header::PRAGMA, "no-cache"),
      (header::EXPIRES, "0"),
    ],
    PIXEL_GIF,
  )
    .into_response()
}

/// `GET /pixel?id=<emailId>`
pub async fn pixel<S>(
  State(state): State<AppState<S>>,
  client: ClientInfo,
  Query(params): Query<PixelParams>,
) -> Response
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let Some(id) = params.id.filter(|id| !id.is_empty()) else {
    return bad_request("missing id");
  };

  match recorder::record_open(&state, &id, client, Utc::now()).await {
    OpenOutcome::Suppressed => StatusCode::NO_CONTENT.into_response(),
    OpenOutcome::Recorded(_) | OpenOutcome::Failed => pixel_response(),
  }
}

/// `GET /click?id=<emailId>&url=<target>`
pub async fn click<S>(
  State(state): State<AppState<S>>,
  client: ClientInfo,
  Query(params): Query<ClickParams>,
) -> Response
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let Some(id) = params.id.filter(|id| !id.is_empty()) else {
    return bad_request("missing id or url");
  };
  let raw_url = params.url.unwrap_or_default();

  match recorder::record_click(&state, &id, &raw_url, client, Utc::now()).await {
    ClickOutcome::Redirect(target) => {
      match HeaderValue::from_str(&urls::redirect_location(&target)) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => bad_request("invalid url"),
      }
    }
    ClickOutcome::InvalidTarget(_) => bad_request("invalid url"),
  }
}
