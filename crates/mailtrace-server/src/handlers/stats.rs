//! `GET /api/stats`

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::Utc;
use mailtrace_core::{
  stats::{DateRange, Stats, parse_bound},
  store::TrackingStore,
};
use serde::Serialize;

use crate::{AppState, error::Error, handlers::RangeParams};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
  pub ok:    bool,
  #[serde(flatten)]
  pub stats: Stats,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<StatsResponse>, Error>
where
  S: TrackingStore + Clone + Send + Sync + 'static,
{
  let params = RangeParams::from_pairs(pairs);
  let (from, to) = params.bounds();
  let from = from.map(parse_bound).transpose()?;
  let to = to.map(parse_bound).transpose()?;
  let range = DateRange::resolve(from, to, Utc::now())?;

  let counts = state
    .store
    .range_counts(&range)
    .await
    .map_err(|e| Error::Stats(Box::new(e)))?;

  Ok(Json(StatsResponse {
    ok:    true,
    stats: Stats::assemble(&range, counts),
  }))
}
