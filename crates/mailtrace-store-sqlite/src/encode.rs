//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored in the canonical form produced by
//! [`mailtrace_core::timestamp::format`]. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use mailtrace_core::{
  email::{Email, EmailCounts},
  event::{Event, EventKind},
  timestamp,
};
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { timestamp::format(dt) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> { Ok(timestamp::parse(s)?) }

pub fn decode_kind(s: &str) -> Result<EventKind> { Ok(s.parse()?) }

/// SQLite hands back counts as `i64`; they are never negative.
pub fn to_count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `emails` row.
pub struct RawEmail {
  pub id:        String,
  pub subject:   Option<String>,
  pub recipient: String,
  pub sent_at:   String,
}

impl RawEmail {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      subject:   row.get(1)?,
      recipient: row.get(2)?,
      sent_at:   row.get(3)?,
    })
  }

  pub fn into_email(self) -> Result<Email> {
    Ok(Email {
      sent_at:   decode_dt(&self.sent_at)?,
      id:        self.id,
      subject:   self.subject.unwrap_or_default(),
      recipient: self.recipient,
    })
  }
}

/// An `emails` row followed by `opens` and `clicks` aggregate columns.
pub struct RawEmailCounts {
  pub email:  RawEmail,
  pub opens:  i64,
  pub clicks: i64,
}

impl RawEmailCounts {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      email:  RawEmail::from_row(row)?,
      opens:  row.get(4)?,
      clicks: row.get(5)?,
    })
  }

  pub fn into_counts(self) -> Result<EmailCounts> {
    Ok(EmailCounts {
      email:  self.email.into_email()?,
      opens:  to_count(self.opens),
      clicks: to_count(self.clicks),
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub id:         String,
  pub email_id:   String,
  pub kind:       String,
  pub timestamp:  String,
  pub ip:         Option<String>,
  pub user_agent: Option<String>,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      email_id:   row.get(1)?,
      kind:       row.get(2)?,
      timestamp:  row.get(3)?,
      ip:         row.get(4)?,
      user_agent: row.get(5)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:         decode_uuid(&self.id)?,
      email_id:   self.email_id,
      kind:       decode_kind(&self.kind)?,
      timestamp:  decode_dt(&self.timestamp)?,
      ip:         self.ip,
      user_agent: self.user_agent,
    })
  }
}
