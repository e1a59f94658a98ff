//! Wire DTOs for the chat session API.
//!
//! The server emits integer ids and snake_case fields; these types absorb
//! that shape and convert into the transport-independent types of
//! `parley-types`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_types::error::RemoteError;
use parley_types::history::SessionHistory;
use parley_types::message::{Message, MessageId, MessageRole};
use parley_types::remote::{MessageList, SendMessageResponse, Validation};
use parley_types::session::{Session, SessionId, SessionStatus, TopicId};

/// An id the server may send as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Str(String),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            WireId::Int(n) => n.to_string(),
            WireId::Str(s) => s,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            WireId::Int(n) => Some(*n),
            WireId::Str(s) => s.parse().ok(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSession {
    pub id: WireId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

impl WireSession {
    pub fn into_session(self, topic: &TopicId) -> Result<Session, RemoteError> {
        let status = match self.status.as_deref() {
            None | Some("") => SessionStatus::Active,
            Some(s) => s.parse::<SessionStatus>().map_err(RemoteError::Decode)?,
        };
        Ok(Session {
            id: SessionId::new(self.id.into_string()),
            topic_id: topic.clone(),
            status,
            is_active: self.is_active,
            title: self.title.filter(|t| !t.trim().is_empty()),
            message_count: self.message_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_activity: self.last_activity,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub id: WireId,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub session: Option<WireId>,
}

impl WireMessage {
    /// Convert, attributing the message to `fallback_session` when the
    /// payload does not name its session.
    pub fn into_message(self, fallback_session: &SessionId) -> Result<Message, RemoteError> {
        let id = self
            .id
            .as_i64()
            .ok_or_else(|| RemoteError::Decode(format!("non-numeric message id {:?}", self.id)))?;
        let role = self.role.parse::<MessageRole>().map_err(RemoteError::Decode)?;
        let session_id = self
            .session
            .map(|s| SessionId::new(s.into_string()))
            .unwrap_or_else(|| fallback_session.clone());
        Ok(Message {
            id: MessageId::Confirmed(id),
            session_id,
            role,
            content: self.content,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default)]
    pub session: Option<WireSession>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ValidateResponse {
    pub fn into_validation(self, topic: &TopicId) -> Result<Validation, RemoteError> {
        Ok(Validation {
            valid: self.valid,
            session: self.session.map(|s| s.into_session(topic)).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub session: Option<WireSession>,
    /// Paginated responses name the list `results`.
    #[serde(default, alias = "results")]
    pub messages: Vec<WireMessage>,
}

impl MessagesResponse {
    pub fn into_list(
        self,
        topic: &TopicId,
        requested: Option<&SessionId>,
    ) -> Result<MessageList, RemoteError> {
        let session = self.session.map(|s| s.into_session(topic)).transpose()?;
        let fallback = session
            .as_ref()
            .map(|s| s.id.clone())
            .or_else(|| requested.cloned())
            .unwrap_or_else(|| SessionId::new(""));
        let messages = self
            .messages
            .into_iter()
            .map(|m| m.into_message(&fallback))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MessageList { messages, session })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Body of `PATCH /api/chat/sessions/{id}/`.
#[derive(Debug, Clone, Serialize)]
pub struct RenameRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    pub user_message: WireMessage,
    pub assistant_message: WireMessage,
    #[serde(default)]
    pub session: Option<WireSession>,
}

impl SendResponse {
    pub fn into_response(
        self,
        topic: &TopicId,
        requested: Option<&SessionId>,
    ) -> Result<SendMessageResponse, RemoteError> {
        let session = self.session.map(|s| s.into_session(topic)).transpose()?;
        let fallback = session
            .as_ref()
            .map(|s| s.id.clone())
            .or_else(|| requested.cloned())
            .unwrap_or_else(|| SessionId::new(""));
        Ok(SendMessageResponse {
            user_message: self.user_message.into_message(&fallback)?,
            assistant_message: self.assistant_message.into_message(&fallback)?,
            session,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryMetadata {
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub active_sessions: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub sessions: Vec<WireSession>,
    #[serde(default)]
    pub metadata: HistoryMetadata,
}

impl HistoryResponse {
    pub fn into_history(self, topic: &TopicId) -> Result<SessionHistory, RemoteError> {
        let sessions = self
            .sessions
            .into_iter()
            .map(|s| s.into_session(topic))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SessionHistory {
            sessions,
            total_count: self.metadata.total_sessions,
            active_count: self.metadata.active_sessions,
        })
    }
}

/// Error payload; the server uses several field names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn summary(self) -> Option<String> {
        match (self.error, self.message, self.detail) {
            (Some(e), Some(m), _) => Some(format!("{e}: {m}")),
            (Some(e), None, _) => Some(e),
            (None, Some(m), _) => Some(m),
            (None, None, d) => d,
        }
    }
}
