//! Optimistic message sends.
//!
//! A send shows the user's message immediately as a provisional entry, then
//! either swaps it for the server's confirmed pair or removes it again.

use std::sync::Arc;

use parley_types::error::SendError;
use parley_types::message::{Message, ProvisionalId};
use parley_types::remote::SendMessageRequest;
use parley_types::session::{Session, SessionId, TopicId};
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::cache::MessageCache;
use crate::remote::SessionRemote;

/// A settled, successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub user_message: Message,
    pub assistant_message: Message,
    /// Set when the server moved the conversation to a different session.
    /// The cache has already been re-keyed to it.
    pub moved_to: Option<Session>,
}

/// Applies sends to the message cache optimistically.
pub struct OptimisticMutator<R> {
    remote: Arc<R>,
    cache: Arc<MessageCache>,
}

impl<R: SessionRemote> OptimisticMutator<R> {
    pub fn new(remote: Arc<R>, cache: Arc<MessageCache>) -> Self {
        Self { remote, cache }
    }

    pub fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    /// Send `text` in `session`.
    ///
    /// Whitespace-only input is rejected without touching the cache or the
    /// server. On failure the cache is left without this send's entry and
    /// the error is returned; the send is never retried.
    pub async fn send(
        &self,
        topic: &TopicId,
        session: &SessionId,
        text: &str,
    ) -> Result<SendOutcome, SendError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let span = info_span!(
            "send",
            send_id = %Uuid::now_v7(),
            topic = %topic,
            session_id = %session,
        );
        self.send_inner(topic, session, content).instrument(span).await
    }

    async fn send_inner(
        &self,
        topic: &TopicId,
        session: &SessionId,
        content: &str,
    ) -> Result<SendOutcome, SendError> {
        let pid = ProvisionalId::next();
        let provisional = Message::provisional_with_id(pid, session.clone(), content.to_string());
        self.cache.append(topic, session, provisional);
        debug!(provisional_id = %pid, "Appended provisional message");

        let request = SendMessageRequest {
            content: content.to_string(),
            session_id: Some(session.clone()),
        };
        match self.remote.send_message(topic, request).await {
            Ok(response) => {
                let moved_to = response.session.filter(|s| &s.id != session);
                let target = match &moved_to {
                    Some(new) => {
                        debug!(new_session_id = %new.id, "Server moved conversation");
                        self.cache.rekey(topic, session, &new.id);
                        new.id.clone()
                    }
                    // A concurrent send may have moved this one's entry.
                    None => self
                        .cache
                        .find_provisional(topic, pid)
                        .unwrap_or_else(|| session.clone()),
                };
                self.cache.reconcile(
                    topic,
                    &target,
                    pid,
                    response.user_message.clone(),
                    response.assistant_message.clone(),
                );
                debug!(
                    user_message_id = %response.user_message.id,
                    assistant_message_id = %response.assistant_message.id,
                    "Reconciled send"
                );
                Ok(SendOutcome {
                    user_message: response.user_message,
                    assistant_message: response.assistant_message,
                    moved_to,
                })
            }
            Err(e) => {
                self.rollback(topic, pid);
                warn!(error = %e, "Send failed, rolled back provisional message");
                Err(SendError::Remote(e))
            }
        }
    }

    fn rollback(&self, topic: &TopicId, pid: ProvisionalId) {
        if !self.cache.remove_provisional(topic, pid) {
            debug!(provisional_id = %pid, "Provisional message already gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeRemote, SendReply, confirmed};
    use parley_types::error::RemoteError;
    use parley_types::message::{MessageId, MessageRole};
    use std::time::Duration;

    fn setup() -> (Arc<FakeRemote>, OptimisticMutator<FakeRemote>) {
        let remote = Arc::new(FakeRemote::new());
        let mutator = OptimisticMutator::new(remote.clone(), Arc::new(MessageCache::new()));
        (remote, mutator)
    }

    #[tokio::test]
    async fn test_send_trims_and_reconciles() {
        let (remote, mutator) = setup();
        let (t, s) = (TopicId::new("7"), SessionId::new("42"));

        let outcome = mutator.send(&t, &s, "  hello  ").await.unwrap();
        assert_eq!(outcome.user_message.content, "hello");
        assert_eq!(outcome.moved_to, None);

        assert_eq!(
            remote.calls(),
            vec![Call::Send(SendMessageRequest {
                content: "hello".into(),
                session_id: Some(s.clone()),
            })]
        );

        let messages = mutator.cache().get(&t, &s);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId::Confirmed(101));
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].id, MessageId::Confirmed(102));
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(mutator.cache().provisional_count(&t), 0);
    }

    #[tokio::test]
    async fn test_whitespace_only_is_rejected_without_request() {
        let (remote, mutator) = setup();
        let (t, s) = (TopicId::new("7"), SessionId::new("42"));

        let err = mutator.send(&t, &s, "   \n\t ").await.unwrap_err();
        assert!(matches!(err, SendError::EmptyMessage));
        assert!(remote.calls().is_empty());
        assert!(mutator.cache().get(&t, &s).is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_restores_snapshot() {
        let (remote, mutator) = setup();
        let (t, s) = (TopicId::new("7"), SessionId::new("42"));
        mutator
            .cache()
            .append(&t, &s, confirmed(1, &s, MessageRole::User, "earlier"));
        let snapshot = mutator.cache().get(&t, &s);

        remote.on_send(SendReply::Fail(RemoteError::Status {
            status: 500,
            message: "boom".into(),
        }));
        let err = mutator.send(&t, &s, "hello").await.unwrap_err();
        assert!(matches!(err, SendError::Remote(_)));

        assert_eq!(mutator.cache().get(&t, &s), snapshot);
        assert_eq!(remote.count(|c| matches!(c, Call::Send(_))), 1, "no retry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_provisional_entry_visible_while_in_flight() {
        let (remote, mutator) = setup();
        let mutator = Arc::new(mutator);
        let (t, s) = (TopicId::new("7"), SessionId::new("42"));
        remote.on_send(SendReply::Delayed(Duration::from_secs(5)));

        let task = {
            let (mutator, t, s) = (mutator.clone(), t.clone(), s.clone());
            tokio::spawn(async move { mutator.send(&t, &s, "hi").await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let pending = mutator.cache().get(&t, &s);
        assert_eq!(pending.len(), 1);
        assert!(pending[0].is_provisional());
        assert_eq!(pending[0].content, "hi");

        task.await.unwrap().unwrap();
        assert_eq!(mutator.cache().provisional_count(&t), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sends_settle_independently() {
        let (remote, mutator) = setup();
        let mutator = Arc::new(mutator);
        let (t, s) = (TopicId::new("7"), SessionId::new("42"));
        // First send fails late, second succeeds early.
        remote.on_send(SendReply::DelayedFail(
            Duration::from_secs(5),
            RemoteError::Transport("reset".into()),
        ));
        remote.on_send(SendReply::Delayed(Duration::from_secs(1)));

        let first = {
            let (mutator, t, s) = (mutator.clone(), t.clone(), s.clone());
            tokio::spawn(async move { mutator.send(&t, &s, "one").await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        let second = {
            let (mutator, t, s) = (mutator.clone(), t.clone(), s.clone());
            tokio::spawn(async move { mutator.send(&t, &s, "two").await })
        };

        let second = second.await.unwrap().unwrap();
        // "one" still pending, "two" confirmed.
        let mid = mutator.cache().get(&t, &s);
        assert_eq!(mid.len(), 3);
        assert_eq!(mutator.cache().provisional_count(&t), 1);
        assert_eq!(mid[0].content, "one");

        assert!(first.await.unwrap().is_err());
        let settled = mutator.cache().get(&t, &s);
        assert_eq!(settled, vec![second.user_message, second.assistant_message]);
        assert_eq!(mutator.cache().provisional_count(&t), 0);
    }

    #[tokio::test]
    async fn test_moved_session_rekeys_cache() {
        let (remote, mutator) = setup();
        let (t, s) = (TopicId::new("7"), SessionId::new("42"));
        mutator
            .cache()
            .append(&t, &s, confirmed(1, &s, MessageRole::User, "earlier"));
        remote.on_send(SendReply::MovedTo(SessionId::new("43")));

        let outcome = mutator.send(&t, &s, "hello").await.unwrap();
        let moved = outcome.moved_to.expect("session moved");
        assert_eq!(moved.id.as_str(), "43");

        assert!(mutator.cache().get(&t, &s).is_empty());
        let messages = mutator.cache().get(&t, &moved.id);
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.session_id == moved.id));
        assert_eq!(mutator.cache().provisional_count(&t), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_send_follows_moved_session() {
        let (remote, mutator) = setup();
        let mutator = Arc::new(mutator);
        let (t, old) = (TopicId::new("7"), SessionId::new("42"));
        let new = SessionId::new("43");
        // The slow send is answered in place, the quick one moves the session.
        remote.on_send(SendReply::Delayed(Duration::from_secs(5)));
        remote.on_send(SendReply::MovedTo(new.clone()));

        let slow = {
            let (mutator, t, old) = (mutator.clone(), t.clone(), old.clone());
            tokio::spawn(async move { mutator.send(&t, &old, "b").await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        let quick = mutator.send(&t, &old, "a").await.unwrap();
        assert_eq!(quick.moved_to.map(|s| s.id), Some(new.clone()));
        let pending = mutator.cache().get(&t, &new);
        assert_eq!(pending.iter().filter(|m| m.is_provisional()).count(), 1);

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.moved_to, None);

        assert!(mutator.cache().get(&t, &old).is_empty());
        let settled = mutator.cache().get(&t, &new);
        let contents: Vec<&str> = settled.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "re: a", "b", "re: b"]);
        assert!(settled.iter().all(|m| m.session_id == new));
        assert_eq!(mutator.cache().provisional_count(&t), 0);
    }
}
