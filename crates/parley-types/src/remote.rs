//! Request and response shapes of the remote session authority.
//!
//! These are transport-independent; the HTTP adapter in parley-infra maps
//! its wire DTOs onto them.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::session::{Session, SessionId};

/// Result of asking the server whether a session is still usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub session: Option<Session>,
}

impl Validation {
    /// The session, if the server confirmed it valid and still live.
    pub fn into_live_session(self) -> Option<Session> {
        if !self.valid {
            return None;
        }
        self.session.filter(Session::is_live)
    }
}

/// Messages of one session, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    /// Session the server resolved the request against, if any.
    pub session: Option<Session>,
}

/// Outgoing chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub session_id: Option<SessionId>,
}

/// The authoritative pair produced by one send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub assistant_message: Message,
    /// Present when the server created or updated the session (e.g. first message).
    pub session: Option<Session>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionStatus, TopicId};
    use chrono::Utc;

    fn session(status: SessionStatus) -> Session {
        Session {
            id: SessionId::new("5"),
            topic_id: TopicId::new("t"),
            status,
            is_active: true,
            title: None,
            message_count: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_activity: Some(Utc::now()),
        }
    }

    #[test]
    fn test_valid_active_session_is_live() {
        let v = Validation {
            valid: true,
            session: Some(session(SessionStatus::Active)),
        };
        assert_eq!(v.into_live_session().unwrap().id.as_str(), "5");
    }

    #[test]
    fn test_valid_but_expired_is_not_live() {
        let v = Validation {
            valid: true,
            session: Some(session(SessionStatus::Expired)),
        };
        assert!(v.into_live_session().is_none());
    }

    #[test]
    fn test_invalid_is_not_live() {
        let v = Validation {
            valid: false,
            session: Some(session(SessionStatus::Active)),
        };
        assert!(v.into_live_session().is_none());

        let empty = Validation {
            valid: true,
            session: None,
        };
        assert!(empty.into_live_session().is_none());
    }
}
