//! Per-session message cache.
//!
//! Keyed by (topic, session). Provisional entries are tagged with their own
//! `ProvisionalId`, so reconciling one send never disturbs another's entry.

use dashmap::DashMap;
use parley_types::message::{Message, MessageId, ProvisionalId};
use parley_types::session::{SessionId, TopicId};

type CacheKey = (TopicId, SessionId);

/// Ordered message lists for each (topic, session).
#[derive(Debug, Default)]
pub struct MessageCache {
    entries: DashMap<CacheKey, Vec<Message>>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current messages, oldest first. Empty when the key is unknown.
    pub fn get(&self, topic: &TopicId, session: &SessionId) -> Vec<Message> {
        self.entries
            .get(&(topic.clone(), session.clone()))
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Replace a session's messages wholesale (after a server fetch).
    pub fn replace(&self, topic: &TopicId, session: &SessionId, messages: Vec<Message>) {
        self.entries
            .insert((topic.clone(), session.clone()), messages);
    }

    pub fn append(&self, topic: &TopicId, session: &SessionId, message: Message) {
        self.entries
            .entry((topic.clone(), session.clone()))
            .or_default()
            .push(message);
    }

    /// Remove one provisional entry wherever it lives under `topic`.
    ///
    /// Returns whether an entry was removed.
    pub fn remove_provisional(&self, topic: &TopicId, id: ProvisionalId) -> bool {
        let target = MessageId::Provisional(id);
        let mut removed = false;
        for mut entry in self.entries.iter_mut() {
            if &entry.key().0 != topic {
                continue;
            }
            let before = entry.len();
            entry.retain(|m| m.id != target);
            removed |= entry.len() != before;
        }
        removed
    }

    /// Session currently holding a provisional entry.
    ///
    /// A re-key moves provisional entries along with everything else, so this
    /// can differ from the session the send started in.
    pub fn find_provisional(&self, topic: &TopicId, id: ProvisionalId) -> Option<SessionId> {
        let target = MessageId::Provisional(id);
        self.entries
            .iter()
            .find(|e| &e.key().0 == topic && e.value().iter().any(|m| m.id == target))
            .map(|e| e.key().1.clone())
    }

    /// Swap a send's provisional entry for the confirmed pair.
    ///
    /// The pair lands under `session` and is stamped with it; the provisional
    /// entry is removed from whichever of the topic's sessions holds it.
    pub fn reconcile(
        &self,
        topic: &TopicId,
        session: &SessionId,
        id: ProvisionalId,
        mut user: Message,
        mut assistant: Message,
    ) {
        self.remove_provisional(topic, id);
        user.session_id = session.clone();
        assistant.session_id = session.clone();
        let mut entry = self
            .entries
            .entry((topic.clone(), session.clone()))
            .or_default();
        entry.push(user);
        entry.push(assistant);
    }

    /// Move a session's messages under a new session id.
    ///
    /// Entries already cached under `to` are kept after the moved ones.
    pub fn rekey(&self, topic: &TopicId, from: &SessionId, to: &SessionId) {
        if from == to {
            return;
        }
        let Some((_, mut moved)) = self.entries.remove(&(topic.clone(), from.clone())) else {
            return;
        };
        for m in &mut moved {
            m.session_id = to.clone();
        }
        let mut entry = self.entries.entry((topic.clone(), to.clone())).or_default();
        moved.append(entry.value_mut());
        *entry = moved;
    }

    /// Drop one session's messages.
    pub fn clear(&self, topic: &TopicId, session: &SessionId) {
        self.entries.remove(&(topic.clone(), session.clone()));
    }

    /// Drop every session cached for `topic`.
    pub fn clear_topic(&self, topic: &TopicId) {
        self.entries.retain(|key, _| &key.0 != topic);
    }

    /// Number of provisional entries across a topic's sessions.
    pub fn provisional_count(&self, topic: &TopicId) -> usize {
        self.entries
            .iter()
            .filter(|e| &e.key().0 == topic)
            .map(|e| e.value().iter().filter(|m| m.is_provisional()).count())
            .sum()
    }
}
