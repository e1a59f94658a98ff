//! Local activity types.
//!
//! `LocalActivityRecord` is the durable per-topic hint used to decide
//! resume-vs-recreate without a network round trip. `ActivityEvent` is
//! the set of user interactions that count as activity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::session::SessionId;

/// Persisted record of the session last used for a topic.
///
/// Stored as `{"sessionId": .., "lastActivity": .., "isValid": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalActivityRecord {
    pub session_id: SessionId,
    pub last_activity: DateTime<Utc>,
    #[serde(default = "default_valid")]
    pub is_valid: bool,
}

fn default_valid() -> bool {
    true
}

impl LocalActivityRecord {
    /// A fresh, valid record stamped at `now`.
    pub fn new(session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            last_activity: now,
            is_valid: true,
        }
    }

    /// Time elapsed since the last recorded activity.
    ///
    /// Clock skew that puts `last_activity` in the future counts as zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_activity).max(Duration::zero())
    }

    /// Whether the record has outlived the inactivity threshold.
    pub fn is_expired(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.elapsed(now) > threshold
    }
}

/// A user interaction that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityEvent::PointerDown => write!(f, "pointer_down"),
            ActivityEvent::PointerMove => write!(f, "pointer_move"),
            ActivityEvent::KeyPress => write!(f, "key_press"),
            ActivityEvent::Scroll => write!(f, "scroll"),
            ActivityEvent::TouchStart => write!(f, "touch_start"),
        }
    }
}
