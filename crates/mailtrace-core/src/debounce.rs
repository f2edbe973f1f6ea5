//! Open debounce policy.
//!
//! Many mail clients fetch remote images the moment a message is delivered,
//! which fires the tracking pixel before anyone has read it. Opens that arrive
//! within a fixed window of the send time are therefore dropped.

use chrono::{DateTime, TimeDelta, Utc};

/// Default window applied when none is configured.
pub const DEFAULT_WINDOW_SECS: u64 = 5;

/// Outcome of [`OpenDebounce::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Record,
  /// The hit came `elapsed` after the send, inside the window.
  Suppress { elapsed: TimeDelta },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDebounce {
  window: TimeDelta,
}

impl OpenDebounce {
  pub fn from_secs(secs: u64) -> Self {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    Self {
      window: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
    }
  }

  pub fn window(&self) -> TimeDelta { self.window }

  /// Decide whether an open observed at `now` should be stored.
  ///
  /// `sent_at` is `None` when the email is unknown; such opens are always
  /// recorded.
  pub fn check(&self, sent_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Decision {
    let Some(sent_at) = sent_at else {
      return Decision::Record;
    };
    let elapsed = now.signed_duration_since(sent_at);
    if elapsed < self.window {
      Decision::Suppress { elapsed }
    } else {
      Decision::Record
    }
  }
}

impl Default for OpenDebounce {
  fn default() -> Self { Self::from_secs(DEFAULT_WINDOW_SECS) }
}
