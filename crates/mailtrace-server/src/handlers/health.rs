use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

/// `GET /`
pub async fn root() -> &'static str { "mailtrace OK" }

/// `GET /api/health`
pub async fn health() -> Json<Value> {
  Json(json!({
    "ok": true,
    "time": mailtrace_core::timestamp::format(Utc::now()),
  }))
}
