//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid api key")]
  Unauthorized,
  #[error("not found")]
  NotFound,
  #[error("{0}")]
  BadRequest(String),
  #[error("email {0:?} already exists")]
  Conflict(String),
  #[error("stats query failed: {0}")]
  Stats(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<mailtrace_core::Error> for Error {
  fn from(e: mailtrace_core::Error) -> Self {
    match e {
      mailtrace_core::Error::Validation(msg) => Error::BadRequest(msg),
      other => Error::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_api_key" }))).into_response()
      }
      Error::NotFound => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))).into_response()
      }
      Error::BadRequest(msg) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
      }
      Error::Conflict(id) => {
        let msg = format!("email {id:?} already exists");
        (StatusCode::CONFLICT, Json(json!({ "error": msg }))).into_response()
      }
      // Internal causes are logged here and never echoed to the caller.
      Error::Stats(e) => {
        tracing::error!(error = %e, "stats query failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "ok": false, "error": "stats_failed" })),
        )
          .into_response()
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "internal_error" })))
          .into_response()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::to_bytes;

  async fn body_json(err: Error) -> (StatusCode, serde_json::Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn unauthorized_is_401() {
    let (status, json) = body_json(Error::Unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "invalid_api_key");
  }

  #[tokio::test]
  async fn validation_maps_to_400_with_message() {
    let core = mailtrace_core::Error::Validation("missing id or recipient".into());
    let (status, json) = body_json(Error::from(core)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "missing id or recipient");
  }

  #[tokio::test]
  async fn store_errors_hide_the_cause() {
    let cause = std::io::Error::other("disk on fire");
    let (status, json) = body_json(Error::Store(Box::new(cause))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal_error");
    assert!(!json.to_string().contains("disk"));
  }

  #[tokio::test]
  async fn stats_errors_keep_the_stats_envelope() {
    let cause = std::io::Error::other("locked");
    let (status, json) = body_json(Error::Stats(Box::new(cause))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "stats_failed");
  }
}
