//! Shared-secret check for the dashboard API.
//!
//! Every `/api/*` path except `/api/health` requires the configured key in
//! the `X-Api-Key` header. The tracking endpoints (`/pixel`, `/click`) are
//! public.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::{ServerConfig, error::Error};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Whether `path` sits behind the shared secret.
pub fn requires_api_key(path: &str) -> bool {
  (path == "/api" || path.starts_with("/api/")) && path != "/api/health"
}

/// Verify the shared secret directly from headers.
pub fn verify_api_key(headers: &HeaderMap, expected: &str) -> Result<(), Error> {
  let presented = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  // Digests are compared so the timing does not depend on the key's prefix.
  if digest(presented) == digest(expected) {
    Ok(())
  } else {
    Err(Error::Unauthorized)
  }
}

fn digest(value: &str) -> [u8; 32] { Sha256::digest(value.as_bytes()).into() }

/// axum middleware enforcing [`verify_api_key`] on protected paths.
pub async fn require_api_key(
  State(config): State<Arc<ServerConfig>>,
  req: Request,
  next: Next,
) -> Response {
  if requires_api_key(req.uri().path())
    && let Err(e) = verify_api_key(req.headers(), &config.api_key)
  {
    tracing::debug!(path = req.uri().path(), "rejected api request");
    return e.into_response();
  }
  next.run(req).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(key: Option<&'static str>) -> HeaderMap {
    let mut map = HeaderMap::new();
    if let Some(key) = key {
      map.insert(API_KEY_HEADER, HeaderValue::from_static(key));
    }
    map
  }

  #[test]
  fn correct_key() {
    assert!(verify_api_key(&headers(Some("s3cret")), "s3cret").is_ok());
  }

  #[test]
  fn wrong_key() {
    assert!(matches!(
      verify_api_key(&headers(Some("s3cre")), "s3cret"),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    assert!(matches!(verify_api_key(&headers(None), "s3cret"), Err(Error::Unauthorized)));
  }

  #[test]
  fn protected_paths() {
    assert!(requires_api_key("/api/emails"));
    assert!(requires_api_key("/api/emails/abc"));
    assert!(requires_api_key("/api/stats"));
    assert!(!requires_api_key("/api/health"));
    assert!(!requires_api_key("/pixel"));
    assert!(!requires_api_key("/click"));
    assert!(!requires_api_key("/apiary"));
    assert!(!requires_api_key("/"));
  }
}
