//! [`SqliteStore`]: the SQLite implementation of [`TrackingStore`].

use std::{collections::BTreeMap, path::Path};

use rusqlite::{Connection, OptionalExtension as _, Params};
use uuid::Uuid;

use mailtrace_core::{
  email::{Email, EmailCounts},
  event::{Event, EventKind, NewEvent},
  stats::{DateRange, RangeCounts, SUMMARY_LIMIT, SummaryFilter},
  store::{Insert, TrackingStore},
};

use crate::{
  Result,
  encode::{RawEmail, RawEmailCounts, RawEvent, encode_dt, encode_uuid, to_count},
  schema::SCHEMA,
};

// ─── Queries ─────────────────────────────────────────────────────────────────

const LIST_EMAILS: &str = "
  SELECT e.id, e.subject, e.recipient, e.sent_at,
         COALESCE(SUM(CASE WHEN ev.type = 'open'  THEN 1 ELSE 0 END), 0) AS opens,
         COALESCE(SUM(CASE WHEN ev.type = 'click' THEN 1 ELSE 0 END), 0) AS clicks
  FROM emails e
  LEFT JOIN events ev ON ev.email_id = e.id
  GROUP BY e.id
  ORDER BY e.sent_at DESC";

// Absent bounds are bound as NULL and disable their half of the filter.
const SUMMARY: &str = "
  SELECT e.id, e.subject, e.recipient, e.sent_at,
         COALESCE(SUM(CASE WHEN ev.type = 'open'  THEN 1 ELSE 0 END), 0) AS opens,
         COALESCE(SUM(CASE WHEN ev.type = 'click' THEN 1 ELSE 0 END), 0) AS clicks
  FROM emails e
  LEFT JOIN events ev ON ev.email_id = e.id
  WHERE (?1 IS NULL OR substr(e.sent_at, 1, 10) >= ?1)
    AND (?2 IS NULL OR substr(e.sent_at, 1, 10) <= ?2)
  GROUP BY e.id
  ORDER BY e.sent_at DESC
  LIMIT ?3";

const EMAILS_IN_RANGE: &str = "
  SELECT COUNT(*) FROM emails
  WHERE substr(sent_at, 1, 10) BETWEEN ?1 AND ?2";

const EMAILS_BY_DAY: &str = "
  SELECT substr(sent_at, 1, 10) AS day, COUNT(*) FROM emails
  WHERE substr(sent_at, 1, 10) BETWEEN ?1 AND ?2
  GROUP BY day";

const EVENTS_IN_RANGE: &str = "
  SELECT COUNT(*) FROM events
  WHERE type = ?3 AND substr(timestamp, 1, 10) BETWEEN ?1 AND ?2";

const DISTINCT_EMAILS_IN_RANGE: &str = "
  SELECT COUNT(DISTINCT email_id) FROM events
  WHERE type = ?3 AND substr(timestamp, 1, 10) BETWEEN ?1 AND ?2";

const DISTINCT_EMAILS_BY_DAY: &str = "
  SELECT substr(timestamp, 1, 10) AS day, COUNT(DISTINCT email_id) FROM events
  WHERE type = ?3 AND substr(timestamp, 1, 10) BETWEEN ?1 AND ?2
  GROUP BY day";

fn count<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<u64> {
  conn
    .query_row(sql, params, |row| row.get::<_, i64>(0))
    .map(to_count)
}

fn count_by_day<P: Params>(
  conn:   &Connection,
  sql:    &str,
  params: P,
) -> rusqlite::Result<BTreeMap<String, u64>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, |row| {
      Ok((row.get::<_, String>(0)?, to_count(row.get(1)?)))
    })?
    .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
  Ok(rows)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tracking store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── TrackingStore impl ──────────────────────────────────────────────────────

impl TrackingStore for SqliteStore {
  type Error = crate::Error;

  // ── Emails ────────────────────────────────────────────────────────────────

  async fn insert_email(&self, email: Email) -> Result<Insert<Email>> {
    let id        = email.id.clone();
    let subject   = email.subject.clone();
    let recipient = email.recipient.clone();
    let sent_at   = encode_dt(email.sent_at);

    let created = self
      .conn
      .call(move |conn| {
        let outcome = conn.execute(
          "INSERT INTO emails (id, subject, recipient, sent_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, subject, recipient, sent_at],
        );
        match outcome {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(if created { Insert::Created(email) } else { Insert::AlreadyExists })
  }

  async fn get_email(&self, id: &str) -> Result<Option<Email>> {
    let id = id.to_owned();

    let raw: Option<RawEmail> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, subject, recipient, sent_at FROM emails WHERE id = ?1",
            rusqlite::params![id],
            RawEmail::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEmail::into_email).transpose()
  }

  async fn list_emails(&self) -> Result<Vec<EmailCounts>> {
    let raws: Vec<RawEmailCounts> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(LIST_EMAILS)?;
        let rows = stmt
          .query_map([], RawEmailCounts::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEmailCounts::into_counts).collect()
  }

  // ── Events ───────────────────────────────────────────────────────────

  async fn record_event(&self, input: NewEvent) -> Result<Event> {
    let event = Event {
      id:         Uuid::new_v4(),
      email_id:   input.email_id,
      kind:       input.kind,
      timestamp:  input.timestamp,
      ip:         input.ip,
      user_agent: input.user_agent,
    };

    let id_str     = encode_uuid(event.id);
    let email_id   = event.email_id.clone();
    let kind       = event.kind.as_str();
    let at_str     = encode_dt(event.timestamp);
    let ip         = event.ip.clone();
    let user_agent = event.user_agent.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (id, email_id, type, timestamp, ip, user_agent)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email_id, kind, at_str, ip, user_agent],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn events_for(&self, email_id: &str) -> Result<Vec<Event>> {
    let email_id = email_id.to_owned();

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, email_id, type, timestamp, ip, user_agent
           FROM events
           WHERE email_id = ?1
           ORDER BY timestamp ASC, rowid ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![email_id], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn range_counts(&self, range: &DateRange) -> Result<RangeCounts> {
    let from  = range.from_key();
    let to    = range.to_key();
    let open  = EventKind::Open.as_str();
    let click = EventKind::Click.as_str();

    let counts = self
      .conn
      .call(move |conn| {
        Ok(RangeCounts {
          emails:        count(conn, EMAILS_IN_RANGE, rusqlite::params![from, to])?,
          opens_total:   count(conn, EVENTS_IN_RANGE, rusqlite::params![from, to, open])?,
          opens_unique:  count(conn, DISTINCT_EMAILS_IN_RANGE, rusqlite::params![from, to, open])?,
          clicks_total:  count(conn, EVENTS_IN_RANGE, rusqlite::params![from, to, click])?,
          clicks_unique: count(conn, DISTINCT_EMAILS_IN_RANGE, rusqlite::params![from, to, click])?,
          emails_by_day: count_by_day(conn, EMAILS_BY_DAY, rusqlite::params![from, to])?,
          opens_by_day:  count_by_day(conn, DISTINCT_EMAILS_BY_DAY, rusqlite::params![from, to, open])?,
          clicks_by_day: count_by_day(conn, DISTINCT_EMAILS_BY_DAY, rusqlite::params![from, to, click])?,
        })
      })
      .await?;

    Ok(counts)
  }

  async fn summary(&self, filter: &SummaryFilter) -> Result<Vec<EmailCounts>> {
    let from  = filter.from.clone();
    let to    = filter.to.clone();
    let limit = SUMMARY_LIMIT as i64;

    let raws: Vec<RawEmailCounts> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(SUMMARY)?;
        let rows = stmt
          .query_map(rusqlite::params![from, to, limit], RawEmailCounts::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEmailCounts::into_counts).collect()
  }
}
