//! The tracked message a caller registers before sending.
//!
//! Emails are created once and never modified. Engagement is recorded as
//! separate append-only [`Event`](crate::event::Event) rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A registered email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
  /// Caller-supplied identifier; unique across the store.
  pub id:        String,
  /// Empty when the caller did not supply one.
  pub subject:   String,
  pub recipient: String,
  #[serde(with = "crate::timestamp")]
  pub sent_at:   DateTime<Utc>,
}

/// Registration request as received from the API. Every field is optional on
/// the wire so missing ones surface as a validation error rather than a
/// deserialisation failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEmail {
  pub id:        Option<String>,
  pub subject:   Option<String>,
  pub recipient: Option<String>,
}

impl NewEmail {
  /// Validate the request and stamp it with `sent_at`.
  pub fn into_email(self, sent_at: DateTime<Utc>) -> Result<Email> {
    let id = self.id.filter(|s| !s.is_empty());
    let recipient = self.recipient.filter(|s| !s.is_empty());

    match (id, recipient) {
      (Some(id), Some(recipient)) => Ok(Email {
        id,
        subject: self.subject.unwrap_or_default(),
        recipient,
        sent_at,
      }),
      _ => Err(Error::Validation("missing id or recipient".to_owned())),
    }
  }
}

/// An email together with its raw open and click counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailCounts {
  #[serde(flatten)]
  pub email:  Email,
  pub opens:  u64,
  pub clicks: u64,
}
