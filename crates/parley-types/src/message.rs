//! Chat message types.
//!
//! Messages shown before the server confirms them carry a `Provisional` id;
//! confirmed messages carry the server's numeric id. The two can never be
//! confused because they are different enum variants, not ranges of the
//! same number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::session::SessionId;

static NEXT_PROVISIONAL_ID: AtomicU64 = AtomicU64::new(1);

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Client-generated identifier for an optimistic entry.
///
/// Unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProvisionalId(pub u64);

impl ProvisionalId {
    /// Allocate a fresh provisional id.
    pub fn next() -> Self {
        Self(NEXT_PROVISIONAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProvisionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// Identity of a message in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessageId {
    /// Shown locally, not yet acknowledged by the server.
    Provisional(ProvisionalId),
    /// Server-assigned, permanent.
    Confirmed(i64),
}

impl MessageId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, MessageId::Provisional(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Provisional(id) => write!(f, "{id}"),
            MessageId::Confirmed(id) => write!(f, "{id}"),
        }
    }
}

/// A single message within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build the optimistic entry for an outgoing user message.
    pub fn provisional(session_id: SessionId, content: String) -> Self {
        Self::provisional_with_id(ProvisionalId::next(), session_id, content)
    }

    pub fn provisional_with_id(id: ProvisionalId, session_id: SessionId, content: String) -> Self {
        Self {
            id: MessageId::Provisional(id),
            session_id,
            role: MessageRole::User,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }

    pub fn provisional_id(&self) -> Option<ProvisionalId> {
        match self.id {
            MessageId::Provisional(id) => Some(id),
            MessageId::Confirmed(_) => None,
        }
    }
}
