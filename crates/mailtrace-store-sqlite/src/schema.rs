//! SQL schema for the mailtrace SQLite store.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// `foreign_keys` is switched off explicitly (the bundled SQLite enables it
/// by default): events may reference emails that were never registered, and
/// those rows are kept. The pragma is per connection; the store holds one.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = OFF;

CREATE TABLE IF NOT EXISTS emails (
    id         TEXT PRIMARY KEY,
    subject    TEXT,
    recipient  TEXT NOT NULL,
    sent_at    TEXT NOT NULL    -- ISO 8601 UTC, millisecond precision
);

-- Events are strictly append-only.
CREATE TABLE IF NOT EXISTS events (
    id          TEXT PRIMARY KEY,
    email_id    TEXT NOT NULL,
    type        TEXT NOT NULL,  -- 'open' | 'click'
    timestamp   TEXT NOT NULL,  -- ISO 8601 UTC, millisecond precision
    ip          TEXT,
    user_agent  TEXT,
    FOREIGN KEY (email_id) REFERENCES emails (id)
);

CREATE INDEX IF NOT EXISTS idx_emails_sent_at          ON emails(sent_at);
CREATE INDEX IF NOT EXISTS idx_events_email_type_time  ON events(email_id, type, timestamp);

PRAGMA user_version = 1;
";
