//! Session history browsing and selection.
//!
//! Lists a topic's past sessions within the server's 30-session ceiling and
//! remembers which one the user picked. A selection is an override consumed
//! by the negotiator on the next negotiation; it never touches the cache.

use std::sync::Arc;

use dashmap::DashMap;
use parley_types::error::HistoryError;
use parley_types::history::{HistoryQuery, MAX_HISTORY_LIMIT, MAX_TITLE_LEN, SessionHistory};
use parley_types::session::{Session, SessionId, TopicId};
use tracing::{debug, info, warn};

use crate::remote::SessionRemote;

pub struct HistoryBrowser<R> {
    remote: Arc<R>,
    default_limit: u32,
    selections: DashMap<TopicId, SessionId>,
}

impl<R: SessionRemote> HistoryBrowser<R> {
    /// `default_limit` applies when a query leaves the limit unset. It is
    /// clamped to the ceiling like any explicit limit.
    pub fn new(remote: Arc<R>, default_limit: u32) -> Self {
        Self {
            remote,
            default_limit: default_limit.clamp(1, MAX_HISTORY_LIMIT),
            selections: DashMap::new(),
        }
    }

    /// List past sessions, most recently updated first.
    ///
    /// Never requests more than the ceiling, whatever the caller asks for.
    pub async fn list_sessions(
        &self,
        topic: &TopicId,
        query: &HistoryQuery,
    ) -> Result<SessionHistory, HistoryError> {
        let bounded = HistoryQuery {
            limit: Some(query.limit.unwrap_or(self.default_limit)),
            ..query.clone()
        };
        let limit = bounded.effective_limit();
        let bounded = HistoryQuery {
            limit: Some(limit),
            ..bounded
        };

        let mut history = self.remote.list_session_history(topic, &bounded).await?;
        history
            .sessions
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        history.sessions.truncate(limit as usize);

        debug!(
            topic = %topic,
            limit,
            returned = history.sessions.len(),
            total = history.total_count,
            active = history.active_count,
            "Loaded session history"
        );
        Ok(history)
    }

    /// Retitle a past session. The title is trimmed before it is sent.
    pub async fn rename_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
        title: &str,
    ) -> Result<Session, HistoryError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(HistoryError::EmptyTitle);
        }
        let len = title.chars().count();
        if len > MAX_TITLE_LEN {
            return Err(HistoryError::TitleTooLong(len));
        }

        let session = self
            .remote
            .rename_session(topic, session_id, title)
            .await
            .inspect_err(|e| warn!(topic = %topic, session_id = %session_id, error = %e, "Rename failed"))?;
        info!(topic = %topic, session_id = %session_id, "Renamed session");
        Ok(session)
    }

    /// Delete a past session and its messages on the server.
    ///
    /// A selection pointing at the deleted session is dropped.
    pub async fn delete_session(&self, topic: &TopicId, session_id: &SessionId) -> Result<(), HistoryError> {
        self.remote
            .delete_session(topic, session_id)
            .await
            .inspect_err(|e| warn!(topic = %topic, session_id = %session_id, error = %e, "Delete failed"))?;
        if self
            .selections
            .remove_if(topic, |_, selected| selected == session_id)
            .is_some()
        {
            debug!(topic = %topic, "Dropped selection of deleted session");
        }
        info!(topic = %topic, session_id = %session_id, "Deleted session");
        Ok(())
    }

    /// Pick a past session for `topic`.
    pub fn select(&self, topic: &TopicId, session_id: SessionId) {
        info!(topic = %topic, session_id = %session_id, "Selected history session");
        self.selections.insert(topic.clone(), session_id);
    }

    /// Return to "continue latest" for `topic`.
    pub fn clear_selection(&self, topic: &TopicId) {
        if self.selections.remove(topic).is_some() {
            debug!(topic = %topic, "Cleared history selection");
        }
    }

    pub fn selection(&self, topic: &TopicId) -> Option<SessionId> {
        self.selections.get(topic).map(|s| s.value().clone())
    }
}
