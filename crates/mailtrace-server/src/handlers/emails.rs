//! `/api/emails` handlers.

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
};
use chrono::Utc;
use mailtrace_core::{
  email::{Email, EmailCounts, NewEmail},
  event::Event,
  stats::SummaryFilter,
  store::{Insert, TrackingStore},
};
use serde::Serialize;

use crate::{
  AppState,
  error::Error,
  handlers::RangeParams,
  urls::{BaseUrl, TrackingUrls, pixel_url},
};

fn store_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}

#[derive(Debug, Serialize)]
pub struct Created {
  pub ok:   bool,
  pub id:   String,
  #[serde(flatten)]
  pub urls: TrackingUrls,
}

/// `POST /api/emails`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  BaseUrl(base): BaseUrl,
  payload: Result<Json<NewEmail>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), Error>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let Json(input) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
  let email = input.into_email(Utc::now())?;
  let id = email.id.clone();

  match state.store.insert_email(email).await.map_err(store_error)? {
    Insert::Created(email) => {
      tracing::info!(email_id = %email.id, "email registered");
      Ok((
        StatusCode::CREATED,
        Json(Created {
          ok:   true,
          urls: TrackingUrls::new(&base, &email.id),
          id:   email.id,
        }),
      ))
    }
    Insert::AlreadyExists => Err(Error::Conflict(id)),
  }
}

#[derive(Debug, Serialize)]
pub struct Listed {
  #[serde(flatten)]
  pub row:   EmailCounts,
  pub pixel: String,
}

/// `GET /api/emails`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  BaseUrl(base): BaseUrl,
) -> Result<Json<Vec<Listed>>, Error>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let rows = state.store.list_emails().await.map_err(store_error)?;
  let listed = rows
    .into_iter()
    .map(|row| Listed {
      pixel: pixel_url(&base, &row.email.id),
      row,
    })
    .collect();
  Ok(Json(listed))
}

#[derive(Debug, Serialize)]
pub struct Detail {
  pub email:  Email,
  pub events: Vec<Event>,
  #[serde(flatten)]
  pub urls:   TrackingUrls,
}

/// `GET /api/emails/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  BaseUrl(base): BaseUrl,
  Path(id): Path<String>,
) -> Result<Json<Detail>, Error>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let email = state
    .store
    .get_email(&id)
    .await
    .map_err(store_error)?
    .ok_or(Error::NotFound)?;
  let events = state.store.events_for(&id).await.map_err(store_error)?;

  Ok(Json(Detail {
    urls: TrackingUrls::new(&base, &email.id),
    email,
    events,
  }))
}

#[derive(Debug, Serialize)]
pub struct Summary {
  pub ok:   bool,
  pub rows: Vec<EmailCounts>,
}

/// `GET /api/emails/summary?from&to`
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Summary>, Error>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let params = RangeParams::from_pairs(pairs);
  let (from, to) = params.bounds();
  let filter = SummaryFilter::from_query(from, to);
  let rows = state.store.summary(&filter).await.map_err(store_error)?;

  tracing::info!(
    from = ?filter.from,
    to = ?filter.to,
    rows = rows.len(),
    "summary"
  );
  Ok(Json(Summary { ok: true, rows }))
}
