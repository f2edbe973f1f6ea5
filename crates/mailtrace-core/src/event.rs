//! Engagement events: pixel opens and link clicks.
//!
//! Events are strictly append-only. The parent email id is not validated on
//! write, so events for unknown ids are stored as-is.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Open,
  Click,
}

impl EventKind {
  pub fn as_str(self) -> &'static str {
    match self {
      EventKind::Open => "open",
      EventKind::Click => "click",
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EventKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "open" => Ok(EventKind::Open),
      "click" => Ok(EventKind::Click),
      other => Err(Error::UnknownEventKind(other.to_owned())),
    }
  }
}

/// Input to [`TrackingStore::record_event`](crate::store::TrackingStore::record_event).
/// The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub email_id:   String,
  pub kind:       EventKind,
  pub timestamp:  DateTime<Utc>,
  pub ip:         Option<String>,
  pub user_agent: Option<String>,
}

impl NewEvent {
  pub fn new(email_id: impl Into<String>, kind: EventKind, timestamp: DateTime<Utc>) -> Self {
    Self {
      email_id: email_id.into(),
      kind,
      timestamp,
      ip: None,
      user_agent: None,
    }
  }
}

/// A persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:         Uuid,
  pub email_id:   String,
  #[serde(rename = "type")]
  pub kind:       EventKind,
  #[serde(with = "crate::timestamp")]
  pub timestamp:  DateTime<Utc>,
  pub ip:         Option<String>,
  pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_round_trips_through_str() {
    for kind in [EventKind::Open, EventKind::Click] {
      assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
    }
    assert!("bounce".parse::<EventKind>().is_err());
  }

  #[test]
  fn event_serializes_kind_as_type() {
    let event = Event {
      id:         Uuid::new_v4(),
      email_id:   "m-1".into(),
      kind:       EventKind::Click,
      timestamp:  Utc::now(),
      ip:         None,
      user_agent: Some("curl/8".into()),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "click");
    assert_eq!(json["user_agent"], "curl/8");
    assert!(json["ip"].is_null());
  }
}
