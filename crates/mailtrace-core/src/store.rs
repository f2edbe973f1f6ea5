//! The `TrackingStore` trait.
//!
//! Implemented by storage backends (e.g. `mailtrace-store-sqlite`). The server
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  email::{Email, EmailCounts},
  event::{Event, NewEvent},
  stats::{DateRange, RangeCounts, SummaryFilter},
};

/// Result of inserting a row keyed by a caller-supplied id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert<T> {
  Created(T),
  /// A row with the same id already exists; nothing was written.
  AlreadyExists,
}

/// Abstraction over a tracking store backend.
///
/// Emails are written once; events are append-only. Neither is ever updated
/// or deleted through this trait.
pub trait TrackingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Emails ────────────────────────────────────────────────────────────

  /// Persist a new email under its caller-supplied id.
  fn insert_email(
    &self,
    email: Email,
  ) -> impl Future<Output = Result<Insert<Email>, Self::Error>> + Send + '_;

  /// Retrieve an email by id. Returns `None` if not found.
  fn get_email<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Email>, Self::Error>> + Send + 'a;

  /// Every email with its open/click counts, newest first.
  fn list_emails(
    &self,
  ) -> impl Future<Output = Result<Vec<EmailCounts>, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Append an event. The id is assigned by the store.
  fn record_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// All events for an email, oldest first.
  fn events_for<'a>(
    &'a self,
    email_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + 'a;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Raw totals and per-day counts for emails sent and events recorded in
  /// `range`.
  fn range_counts<'a>(
    &'a self,
    range: &'a DateRange,
  ) -> impl Future<Output = Result<RangeCounts, Self::Error>> + Send + 'a;

  /// Up to [`SUMMARY_LIMIT`](crate::stats::SUMMARY_LIMIT) emails sent within
  /// `filter`, newest first, with all-time open/click counts.
  fn summary<'a>(
    &'a self,
    filter: &'a SummaryFilter,
  ) -> impl Future<Output = Result<Vec<EmailCounts>, Self::Error>> + Send + 'a;
}
