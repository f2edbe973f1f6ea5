//! ISO 8601 timestamp encoding shared by the store and the JSON surface.
//!
//! Every timestamp is written in UTC with millisecond precision and a `Z`
//! suffix, e.g. `2026-10-18T09:15:02.123Z`. The first ten characters are
//! therefore always the UTC calendar date; day bucketing in the aggregator
//! relies on that prefix.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use crate::{Error, Result};

/// Render `dt` in the canonical stored form.
pub fn format(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp and convert it to UTC.
pub fn parse(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp {
      value:  s.to_owned(),
      reason: e.to_string(),
    })
}

/// `#[serde(with = "mailtrace_core::timestamp")]` support.
pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
  S: Serializer,
{
  serializer.serialize_str(&format(*dt))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  parse(&raw).map_err(serde::de::Error::custom)
}
