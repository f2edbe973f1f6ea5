//! Public tracking URL derivation and URL component helpers.

use std::borrow::Cow;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use mailtrace_core::store::TrackingStore;
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;

use crate::AppState;

/// Target used for the sample click link handed back on registration.
pub const EXAMPLE_TARGET: &str = "https://example.com";

/// Characters left untouched when encoding a URL component; everything else is
/// percent-encoded.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')');

pub fn encode_component(value: &str) -> String {
  utf8_percent_encode(value, COMPONENT).to_string()
}

/// Percent-decode `value`, returning it unchanged if the result is not UTF-8.
pub fn decode_component(value: &str) -> String {
  percent_decode_str(value)
    .decode_utf8()
    .map(Cow::into_owned)
    .unwrap_or_else(|_| value.to_owned())
}

/// Whether `target` is an absolute `http://` or `https://` URL (scheme
/// matched case-insensitively).
pub fn is_http_url(target: &str) -> bool {
  ["http://", "https://"].iter().any(|scheme| {
    target
      .get(..scheme.len())
      .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
  })
}

/// Bytes that cannot appear verbatim in a `Location` header.
const LOCATION_UNSAFE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>');

/// Make a decoded redirect target safe to send back as a header value.
/// Non-ASCII characters, controls and spaces are percent-encoded; existing
/// escapes are left alone.
pub fn redirect_location(target: &str) -> String {
  utf8_percent_encode(target, LOCATION_UNSAFE).to_string()
}

// ─── Base URL ────────────────────────────────────────────────────────────────

fn first_entry(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

/// The externally visible origin of this service.
///
/// A configured override wins (trailing slashes removed). Otherwise the
/// origin is rebuilt from `X-Forwarded-Proto` / `X-Forwarded-Host`, falling
/// back to `http` and the `Host` header.
pub fn public_base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
  if let Some(base) = configured.filter(|b| !b.is_empty()) {
    return base.trim_end_matches('/').to_owned();
  }
  let proto = first_entry(headers, "x-forwarded-proto").unwrap_or_else(|| "http".to_owned());
  let host = first_entry(headers, "x-forwarded-host")
    .or_else(|| first_entry(headers, header::HOST.as_str()))
    .unwrap_or_default();
  format!("{proto}://{host}")
}

/// Extractor yielding [`public_base_url`] for the current request.
pub struct BaseUrl(pub String);

impl<S> FromRequestParts<AppState<S>> for BaseUrl
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(BaseUrl(public_base_url(
      state.config.public_base_url.as_deref(),
      &parts.headers,
    )))
  }
}

// ─── Tracking URLs ───────────────────────────────────────────────────────────

pub fn pixel_url(base: &str, id: &str) -> String {
  format!("{base}/pixel?id={}", encode_component(id))
}

/// The URLs a sender embeds in an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingUrls {
  pub pixel:          String,
  /// Click URL missing only the percent-encoded target.
  pub click_template: String,
  pub click_example:  String,
}

impl TrackingUrls {
  pub fn new(base: &str, id: &str) -> Self {
    let click_template = format!("{base}/click?id={}&url=", encode_component(id));
    Self {
      pixel: pixel_url(base, id),
      click_example: format!("{click_template}{}", encode_component(EXAMPLE_TARGET)),
      click_template,
    }
  }
}
