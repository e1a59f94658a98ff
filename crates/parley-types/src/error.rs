use thiserror::Error;

use crate::session::{SessionId, TopicId};

/// Errors from the local key/value persistence layer.
///
/// These never reach callers of the activity store: a failed read degrades
/// to "no record" and a failed write is logged and dropped.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("corrupt record under '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// Errors from calls to the remote session authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Only connection-level failures and gateway errors qualify; an answer
    /// the server actually gave (4xx, 500, undecodable body) is final.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(_) | RemoteError::Timeout => true,
            RemoteError::Status { status, .. } => matches!(status, 502..=504),
            RemoteError::Decode(_) => false,
        }
    }
}

/// Errors from session negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("selected session {0} is no longer valid")]
    SelectedSessionInvalid(SessionId),

    #[error("validation of selected session {0} timed out")]
    SelectionTimedOut(SessionId),

    #[error("could not acquire a session: {0}")]
    Acquisition(#[source] RemoteError),

    #[error("negotiation for topic '{0}' was superseded")]
    Superseded(TopicId),

    #[error("no topic is open")]
    NoTopic,
}

/// Errors from sending a message.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("no session is ready")]
    NoSession,

    #[error("send failed: {0}")]
    Remote(#[from] RemoteError),
}

/// Errors from the history browser.
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    #[error("session history request failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("no topic is open")]
    NoTopic,

    #[error("session title must not be empty")]
    EmptyTitle,

    #[error("session title is {0} characters long, at most {max} are allowed", max = crate::history::MAX_TITLE_LEN)]
    TitleTooLong(usize),
}
