//! Date ranges and aggregate statistics.
//!
//! Day bucketing compares the first ten characters of stored ISO timestamps
//! (`YYYY-MM-DD`) as strings. This matches calendar days only because every
//! timestamp is written in UTC (see [`crate::timestamp`]); a row stored with a
//! non-UTC offset would land in the wrong bucket.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{Error, Result};

/// Span of the default stats range, ending today.
pub const DEFAULT_SPAN_DAYS: i64 = 30;

/// Longest range the stats endpoint will build a timeline for.
pub const MAX_SPAN_DAYS: i64 = 3660;

/// Row cap for [`TrackingStore::summary`](crate::store::TrackingStore::summary).
pub const SUMMARY_LIMIT: usize = 1000;

/// Format a date as the `YYYY-MM-DD` bucket key.
pub fn day_key(date: NaiveDate) -> String { date.format("%Y-%m-%d").to_string() }

// ─── Ranges ──────────────────────────────────────────────────────────────────

/// An inclusive range of whole UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub from: NaiveDate,
  pub to:   NaiveDate,
}

impl DateRange {
  /// Resolve optional bounds against `now`.
  ///
  /// `to` defaults to `now`; `from` defaults to `DEFAULT_SPAN_DAYS` before
  /// `to`. Both are then truncated to their UTC calendar day.
  pub fn resolve(
    from: Option<DateTime<Utc>>,
    to:   Option<DateTime<Utc>>,
    now:  DateTime<Utc>,
  ) -> Result<Self> {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or_else(|| {
      to.checked_sub_signed(TimeDelta::days(DEFAULT_SPAN_DAYS))
        .unwrap_or(to)
    });

    let range = Self {
      from: from.date_naive(),
      to:   to.date_naive(),
    };
    if range.span_days() > MAX_SPAN_DAYS {
      return Err(Error::Validation(format!(
        "date range exceeds {MAX_SPAN_DAYS} days"
      )));
    }
    Ok(range)
  }

  /// Number of days covered; zero or negative when `from > to`.
  pub fn span_days(&self) -> i64 {
    self.to.signed_duration_since(self.from).num_days() + 1
  }

  /// Every day in the range, ascending. Empty when `from > to`.
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
    self.from.iter_days().take_while(|d| *d <= self.to)
  }

  pub fn from_key(&self) -> String { day_key(self.from) }

  pub fn to_key(&self) -> String { day_key(self.to) }
}

/// Parse a stats range bound: `YYYY-MM-DD` (midnight UTC), a full RFC 3339
/// timestamp, or a date-time without offset (taken as UTC).
pub fn parse_bound(raw: &str) -> Result<DateTime<Utc>> {
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    return Ok(date.and_time(NaiveTime::MIN).and_utc());
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
    return Ok(naive.and_utc());
  }
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::Validation(format!("invalid date: {raw:?}")))
}

// ─── Raw counts ──────────────────────────────────────────────────────────────

/// Counts over a [`DateRange`] as produced by the store. Per-day maps are
/// keyed by `YYYY-MM-DD` and only contain days that had activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeCounts {
  pub emails:        u64,
  pub opens_total:   u64,
  pub opens_unique:  u64,
  pub clicks_total:  u64,
  pub clicks_unique: u64,
  pub emails_by_day: BTreeMap<String, u64>,
  /// Distinct emails opened per day.
  pub opens_by_day:  BTreeMap<String, u64>,
  /// Distinct emails clicked per day.
  pub clicks_by_day: BTreeMap<String, u64>,
}

// ─── Assembled stats ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeKeys {
  pub from: String,
  pub to:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
  pub emails:        u64,
  pub opens_unique:  u64,
  pub opens_total:   u64,
  pub clicks_unique: u64,
  pub clicks_total:  u64,
  pub open_rate:     f64,
  pub ctr:           f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineDay {
  pub date:          String,
  pub emails:        u64,
  pub opens_unique:  u64,
  pub clicks_unique: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
  pub range:    RangeKeys,
  pub totals:   Totals,
  pub timeline: Vec<TimelineDay>,
}

impl Stats {
  /// Derive rates and a zero-filled timeline from raw counts.
  pub fn assemble(range: &DateRange, counts: RangeCounts) -> Self {
    let bucket = |map: &BTreeMap<String, u64>, key: &str| map.get(key).copied().unwrap_or(0);

    let timeline = range
      .days()
      .map(|day| {
        let date = day_key(day);
        TimelineDay {
          emails:        bucket(&counts.emails_by_day, &date),
          opens_unique:  bucket(&counts.opens_by_day, &date),
          clicks_unique: bucket(&counts.clicks_by_day, &date),
          date,
        }
      })
      .collect();

    Self {
      range: RangeKeys {
        from: range.from_key(),
        to:   range.to_key(),
      },
      totals: Totals {
        emails:        counts.emails,
        opens_unique:  counts.opens_unique,
        opens_total:   counts.opens_total,
        clicks_unique: counts.clicks_unique,
        clicks_total:  counts.clicks_total,
        open_rate:     rate(counts.opens_unique, counts.emails),
        ctr:           rate(counts.clicks_unique, counts.emails),
      },
      timeline,
    }
  }
}

fn rate(part: u64, whole: u64) -> f64 {
  if whole == 0 {
    0.0
  } else {
    part as f64 / whole as f64
  }
}

// ─── Summary filter ──────────────────────────────────────────────────────────

/// Optional sent-at bounds for the per-email summary, compared as text
/// against the first ten characters of `sent_at`. Either side may be absent;
/// `from > to` is allowed and simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFilter {
  pub from: Option<String>,
  pub to:   Option<String>,
}

impl SummaryFilter {
  /// Build a filter from raw query values. Anything not shaped like
  /// `YYYY-MM-DD` is ignored; the date itself is not validated, so
  /// `2026-02-30` still bounds by string order.
  pub fn from_query(from: Option<&str>, to: Option<&str>) -> Self {
    Self {
      from: from.filter(|v| is_day_shaped(v)).map(str::to_owned),
      to:   to.filter(|v| is_day_shaped(v)).map(str::to_owned),
    }
  }

  pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
    Self {
      from: Some(day_key(from)),
      to:   Some(day_key(to)),
    }
  }
}

fn is_day_shaped(raw: &str) -> bool {
  raw.len() == 10
    && raw.bytes().enumerate().all(|(i, b)| match i {
      4 | 7 => b == b'-',
      _ => b.is_ascii_digit(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 18, 15, 30, 0).unwrap() }

  #[test]
  fn default_range_is_last_thirty_days() {
    let range = DateRange::resolve(None, None, now()).unwrap();
    assert_eq!(range.from, date(2026, 9, 18));
    assert_eq!(range.to, date(2026, 10, 18));
    assert_eq!(range.days().count(), 31);
  }

  #[test]
  fn from_defaults_relative_to_explicit_to() {
    let to = parse_bound("2026-03-01").unwrap();
    let range = DateRange::resolve(None, Some(to), now()).unwrap();
    assert_eq!(range.from, date(2026, 1, 30));
    assert_eq!(range.to, date(2026, 3, 1));
  }

  #[test]
  fn bounds_are_truncated_to_utc_days() {
    let from = parse_bound("2026-10-01T23:59:59-02:00").unwrap();
    let to = parse_bound("2026-10-03T00:00:01Z").unwrap();
    let range = DateRange::resolve(Some(from), Some(to), now()).unwrap();
    assert_eq!(range.from, date(2026, 10, 2));
    assert_eq!(range.to_key(), "2026-10-03");
  }

  #[test]
  fn parse_bound_rejects_garbage() {
    assert!(matches!(parse_bound("last week"), Err(Error::Validation(_))));
  }

  #[test]
  fn oversized_range_is_rejected() {
    let from = parse_bound("1990-01-01").unwrap();
    assert!(DateRange::resolve(Some(from), None, now()).is_err());
  }

  #[test]
  fn inverted_range_has_no_days() {
    let range = DateRange::resolve(
      Some(parse_bound("2026-10-10").unwrap()),
      Some(parse_bound("2026-10-01").unwrap()),
      now(),
    )
    .unwrap();
    assert_eq!(range.days().count(), 0);
    assert_eq!(Stats::assemble(&range, RangeCounts::default()).timeline.len(), 0);
  }

  #[test]
  fn timeline_is_zero_filled_and_ascending() {
    let range = DateRange { from: date(2026, 2, 27), to: date(2026, 3, 2) };
    let counts = RangeCounts {
      emails: 3,
      emails_by_day: BTreeMap::from([
        ("2026-02-27".to_owned(), 2),
        ("2026-03-02".to_owned(), 1),
      ]),
      opens_by_day: BTreeMap::from([("2026-02-28".to_owned(), 1)]),
      ..RangeCounts::default()
    };

    let stats = Stats::assemble(&range, counts);
    let dates: Vec<&str> = stats.timeline.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(dates, ["2026-02-27", "2026-02-28", "2026-03-01", "2026-03-02"]);
    let emails: Vec<u64> = stats.timeline.iter().map(|d| d.emails).collect();
    assert_eq!(emails, [2, 0, 0, 1]);
    assert_eq!(stats.timeline[1].opens_unique, 1);
    assert_eq!(stats.timeline[2].clicks_unique, 0);
  }

  #[test]
  fn rates_use_unique_counts() {
    let range = DateRange { from: date(2026, 1, 1), to: date(2026, 1, 1) };
    let counts = RangeCounts {
      emails: 4,
      opens_total: 9,
      opens_unique: 2,
      clicks_total: 3,
      clicks_unique: 1,
      ..RangeCounts::default()
    };
    let totals = Stats::assemble(&range, counts).totals;
    assert_eq!(totals.open_rate, 0.5);
    assert_eq!(totals.ctr, 0.25);
    assert_eq!(totals.opens_total, 9);
  }

  #[test]
  fn rates_are_zero_without_emails() {
    let range = DateRange { from: date(2026, 1, 1), to: date(2026, 1, 1) };
    let counts = RangeCounts { opens_unique: 3, clicks_unique: 2, ..RangeCounts::default() };
    let totals = Stats::assemble(&range, counts).totals;
    assert_eq!(totals.open_rate, 0.0);
    assert_eq!(totals.ctr, 0.0);
  }

  #[test]
  fn summary_filter_ignores_malformed_bounds() {
    let filter = SummaryFilter::from_query(Some("2026-10-01"), Some("oct 9"));
    assert_eq!(filter.from.as_deref(), Some("2026-10-01"));
    assert_eq!(filter.to, None);

    let filter = SummaryFilter::from_query(Some("2026-1-1"), Some("2026-10-01T00"));
    assert_eq!(filter, SummaryFilter::default());
  }

  #[test]
  fn summary_filter_keeps_impossible_but_well_shaped_dates() {
    let filter = SummaryFilter::from_query(None, Some("2026-02-30"));
    assert_eq!(filter.to.as_deref(), Some("2026-02-30"));
  }

  #[test]
  fn parse_bound_accepts_offsetless_datetimes_as_utc() {
    let dt = parse_bound("2026-10-10T10:00:00").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2026, 10, 10, 10, 0, 0).unwrap());
    let dt = parse_bound("2026-10-10T23:30:00.250").unwrap();
    assert_eq!(dt.date_naive(), date(2026, 10, 10));
  }
}
