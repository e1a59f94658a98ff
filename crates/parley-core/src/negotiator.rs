//! Session negotiation.
//!
//! Decides, for a topic, whether to resume the locally remembered session,
//! honour an explicit history selection, or acquire a session from the
//! server. The local record is only a hint: the server's validation answer
//! always wins.

use std::sync::Arc;
use std::time::Duration;

use parley_types::error::{RemoteError, SessionError};
use parley_types::session::{Session, SessionId, TopicId};
use tracing::{debug, info, warn};

use crate::activity::LocalActivityStore;
use crate::remote::SessionRemote;
use crate::retry::{RetryPolicy, with_retry};
use crate::storage::kv_store::KvStore;

/// Observable negotiation progress for one topic.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationState {
    Idle,
    Validating,
    Resumed,
    Recreating,
    Ready(Session),
    Failed(SessionError),
}

impl NegotiationState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            NegotiationState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NegotiationState::Idle => "idle",
            NegotiationState::Validating => "validating",
            NegotiationState::Resumed => "resumed",
            NegotiationState::Recreating => "recreating",
            NegotiationState::Ready(_) => "ready",
            NegotiationState::Failed(_) => "failed",
        }
    }
}

/// How the session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The locally remembered session was confirmed by the server.
    Resumed,
    /// The server returned its current session (possibly new).
    Acquired,
    /// An explicitly selected history session was confirmed.
    Selected,
}

/// A session ready for use.
#[derive(Debug, Clone, PartialEq)]
pub struct Negotiated {
    pub session: Session,
    pub outcome: NegotiationOutcome,
}

/// Bounded validation result.
#[derive(Debug)]
enum Verdict {
    Live(Session),
    /// The server answered: not usable.
    Rejected,
    TimedOut,
    Unreachable(RemoteError),
}

/// Resolves the session to use for a topic.
pub struct SessionNegotiator<R, K: KvStore> {
    remote: Arc<R>,
    store: Arc<LocalActivityStore<K>>,
    validation_timeout: Duration,
    retry: RetryPolicy,
}

impl<R, K> SessionNegotiator<R, K>
where
    R: SessionRemote + 'static,
    K: KvStore,
{
    pub fn new(
        remote: Arc<R>,
        store: Arc<LocalActivityStore<K>>,
        validation_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            remote,
            store,
            validation_timeout,
            retry,
        }
    }

    /// Negotiate a session for `topic`.
    ///
    /// With `selected`, exactly that session is validated and any failure is
    /// returned; no fallback session is created. Without it, the local
    /// record is tried first and the server's current session is acquired
    /// when the record is absent, stale, rejected or unverifiable.
    ///
    /// `progress` observes each state transition.
    pub async fn negotiate(
        &self,
        topic: &TopicId,
        selected: Option<&SessionId>,
        progress: &(dyn Fn(NegotiationState) + Send + Sync),
    ) -> Result<Negotiated, SessionError> {
        if let Some(id) = selected {
            return self.negotiate_selected(topic, id, progress).await;
        }

        if let Some(record) = self.store.get(topic).await {
            if record.is_valid {
                progress(NegotiationState::Validating);
                match self.validate_bounded(topic, &record.session_id).await {
                    Verdict::Live(session) => {
                        self.store.store(topic, &session.id).await;
                        info!(topic = %topic, session_id = %session.id, "Resumed session");
                        progress(NegotiationState::Resumed);
                        progress(NegotiationState::Ready(session.clone()));
                        return Ok(Negotiated {
                            session,
                            outcome: NegotiationOutcome::Resumed,
                        });
                    }
                    Verdict::Rejected => {
                        info!(
                            topic = %topic,
                            session_id = %record.session_id,
                            "Remembered session rejected by server"
                        );
                        self.store.clear(topic).await;
                    }
                    Verdict::TimedOut => {
                        warn!(
                            topic = %topic,
                            session_id = %record.session_id,
                            timeout_secs = self.validation_timeout.as_secs(),
                            "Session validation timed out"
                        );
                        self.store.invalidate(topic).await;
                    }
                    Verdict::Unreachable(e) => {
                        warn!(
                            topic = %topic,
                            session_id = %record.session_id,
                            error = %e,
                            "Session validation failed"
                        );
                        self.store.invalidate(topic).await;
                    }
                }
            } else {
                debug!(topic = %topic, "Local record marked invalid, skipping validation");
            }
        }

        self.acquire(topic, progress).await
    }

    /// Ask the server for its current session and remember it.
    async fn acquire(
        &self,
        topic: &TopicId,
        progress: &(dyn Fn(NegotiationState) + Send + Sync),
    ) -> Result<Negotiated, SessionError> {
        progress(NegotiationState::Recreating);
        let result = with_retry(self.retry, "get_or_create_session", || {
            self.remote.get_or_create_session(topic)
        })
        .await;

        match result {
            Ok(session) => {
                self.store.store(topic, &session.id).await;
                info!(topic = %topic, session_id = %session.id, "Acquired session");
                progress(NegotiationState::Ready(session.clone()));
                Ok(Negotiated {
                    session,
                    outcome: NegotiationOutcome::Acquired,
                })
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Session acquisition failed");
                self.store.clear(topic).await;
                let err = SessionError::Acquisition(e);
                progress(NegotiationState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    async fn negotiate_selected(
        &self,
        topic: &TopicId,
        id: &SessionId,
        progress: &(dyn Fn(NegotiationState) + Send + Sync),
    ) -> Result<Negotiated, SessionError> {
        progress(NegotiationState::Validating);
        let result = match self.validate_bounded(topic, id).await {
            Verdict::Live(session) => Ok(session),
            Verdict::Rejected => Err(SessionError::SelectedSessionInvalid(id.clone())),
            Verdict::TimedOut => Err(SessionError::SelectionTimedOut(id.clone())),
            Verdict::Unreachable(e) => Err(SessionError::Acquisition(e)),
        };

        match result {
            Ok(session) => {
                self.store.store(topic, &session.id).await;
                info!(topic = %topic, session_id = %session.id, "Opened selected session");
                progress(NegotiationState::Ready(session.clone()));
                Ok(Negotiated {
                    session,
                    outcome: NegotiationOutcome::Selected,
                })
            }
            Err(e) => {
                warn!(topic = %topic, session_id = %id, error = %e, "Selected session unavailable");
                progress(NegotiationState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Validate with a time bound.
    ///
    /// The request runs on its own task, so hitting the bound only stops
    /// waiting; the request itself is left to finish.
    async fn validate_bounded(&self, topic: &TopicId, id: &SessionId) -> Verdict {
        let remote = Arc::clone(&self.remote);
        let (task_topic, task_id) = (topic.clone(), id.clone());
        let request =
            tokio::spawn(async move { remote.validate_session(&task_topic, &task_id).await });

        match tokio::time::timeout(self.validation_timeout, request).await {
            Err(_) => Verdict::TimedOut,
            Ok(Err(join)) => Verdict::Unreachable(RemoteError::Transport(join.to_string())),
            Ok(Ok(Err(e))) => Verdict::Unreachable(e),
            Ok(Ok(Ok(validation))) => match validation.into_live_session() {
                Some(session) => Verdict::Live(session),
                None => Verdict::Rejected,
            },
        }
    }
}

impl<R, K: KvStore> std::fmt::Debug for SessionNegotiator<R, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionNegotiator")
            .field("validation_timeout", &self.validation_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
