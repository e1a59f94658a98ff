//! SessionRemote trait definition.
//!
//! The remote session authority owns sessions and messages. Implementations
//! live in parley-infra (e.g. `HttpSessionRemote`); tests use in-process
//! fakes. Uses native async fn in traits (RPITIT, Rust 2024 edition).

use parley_types::error::RemoteError;
use parley_types::history::{HistoryQuery, SessionHistory};
use parley_types::remote::{MessageList, SendMessageRequest, SendMessageResponse, Validation};
use parley_types::session::{Session, SessionId, TopicId};

/// Operations the client needs from the session authority.
pub trait SessionRemote: Send + Sync {
    /// Return the topic's current session, creating one if none exists.
    fn get_or_create_session(
        &self,
        topic: &TopicId,
    ) -> impl std::future::Future<Output = Result<Session, RemoteError>> + Send;

    /// Always create a fresh session for the topic.
    fn create_session(
        &self,
        topic: &TopicId,
    ) -> impl std::future::Future<Output = Result<Session, RemoteError>> + Send;

    /// Ask whether a session is still usable.
    ///
    /// An explicit rejection is `Ok(Validation { valid: false, .. })`, not an
    /// error.
    fn validate_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Validation, RemoteError>> + Send;

    /// Messages of a session, oldest first. Without a session id the server
    /// resolves the topic's current session.
    fn list_messages(
        &self,
        topic: &TopicId,
        session_id: Option<&SessionId>,
    ) -> impl std::future::Future<Output = Result<MessageList, RemoteError>> + Send;

    /// Send one user message and receive the authoritative pair.
    fn send_message(
        &self,
        topic: &TopicId,
        request: SendMessageRequest,
    ) -> impl std::future::Future<Output = Result<SendMessageResponse, RemoteError>> + Send;

    /// Past sessions of the topic.
    fn list_session_history(
        &self,
        topic: &TopicId,
        query: &HistoryQuery,
    ) -> impl std::future::Future<Output = Result<SessionHistory, RemoteError>> + Send;

    /// Change a session's title and return the updated session.
    fn rename_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
        title: &str,
    ) -> impl std::future::Future<Output = Result<Session, RemoteError>> + Send;

    /// Delete a session together with its messages.
    fn delete_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;
}
