//! Chat controller.
//!
//! Owns everything tied to the lifetime of one open topic: the negotiated
//! session, the activity tracker and the message cache key. Opening another
//! topic bumps a generation counter so that a negotiation still in flight
//! for the previous topic cannot install its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use parley_types::activity::ActivityEvent;
use parley_types::config::ParleyConfig;
use parley_types::error::{HistoryError, SendError, SessionError};
use parley_types::history::{HistoryQuery, SessionHistory};
use parley_types::message::Message;
use parley_types::session::{Session, SessionId, TopicId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity::{LocalActivityStore, TrackerHandle, spawn_sweeper};
use crate::cache::MessageCache;
use crate::history::HistoryBrowser;
use crate::mutator::{OptimisticMutator, SendOutcome};
use crate::negotiator::{Negotiated, NegotiationState, SessionNegotiator};
use crate::remote::SessionRemote;
use crate::retry::{RetryPolicy, with_retry};
use crate::storage::kv_store::KvStore;

#[derive(Debug, Default)]
struct Current {
    topic: Option<TopicId>,
    session: Option<Session>,
    tracker: Option<TrackerHandle>,
}

/// Per-topic session lifecycle owner.
///
/// Must be created inside a tokio runtime: construction starts the
/// background sweep of expired activity records.
pub struct ChatController<R, K>
where
    R: SessionRemote + 'static,
    K: KvStore + 'static,
{
    remote: Arc<R>,
    store: Arc<LocalActivityStore<K>>,
    cache: Arc<MessageCache>,
    negotiator: SessionNegotiator<R, K>,
    mutator: OptimisticMutator<R>,
    history: HistoryBrowser<R>,
    retry: RetryPolicy,
    activity_throttle: Duration,
    generation: AtomicU64,
    current: Mutex<Current>,
    state: watch::Sender<NegotiationState>,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<R, K> ChatController<R, K>
where
    R: SessionRemote + 'static,
    K: KvStore + 'static,
{
    pub fn new(remote: Arc<R>, store: Arc<LocalActivityStore<K>>, config: &ParleyConfig) -> Self {
        let cache = Arc::new(MessageCache::new());
        let retry = RetryPolicy::new(config.acquire_max_retries, config.acquire_backoff());
        let cancel = CancellationToken::new();
        let sweeper = spawn_sweeper(store.clone(), config.sweep_interval(), cancel.child_token());
        let (state, _) = watch::channel(NegotiationState::Idle);

        Self {
            negotiator: SessionNegotiator::new(
                remote.clone(),
                store.clone(),
                config.validation_timeout(),
                retry,
            ),
            mutator: OptimisticMutator::new(remote.clone(), cache.clone()),
            history: HistoryBrowser::new(remote.clone(), config.history_limit()),
            remote,
            store,
            cache,
            retry,
            activity_throttle: config.activity_throttle(),
            generation: AtomicU64::new(0),
            current: Mutex::new(Current::default()),
            state,
            cancel,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Switch to `topic` and negotiate its session.
    ///
    /// Any tracker for the previous topic is detached first. If another
    /// topic is opened before this negotiation resolves, this call returns
    /// `SessionError::Superseded` and leaves no trace.
    pub async fn open_topic(&self, topic: TopicId) -> Result<Session, SessionError> {
        self.open_topic_with_selection(topic, None).await
    }

    /// Switch to `topic`, trying `selection` instead of the default flow.
    ///
    /// With a selection no session is acquired or created: an unusable
    /// selection is dropped and its error returned. Without one this is
    /// `open_topic`.
    pub async fn open_topic_with_selection(
        &self,
        topic: TopicId,
        selection: Option<SessionId>,
    ) -> Result<Session, SessionError> {
        let generation = self.next_generation();
        let previous = {
            let mut current = self.lock_current();
            current.topic = Some(topic.clone());
            current.session = None;
            current.tracker.take()
        };
        if let Some(tracker) = previous {
            tracker.detach().await;
        }
        info!(topic = %topic, selected = ?selection, "Opened topic");
        let Some(session_id) = selection else {
            return self.negotiate(topic, generation).await;
        };
        self.history.select(&topic, session_id);
        let result = self.negotiate(topic.clone(), generation).await;
        if result.is_err() {
            self.history.clear_selection(&topic);
        }
        result
    }

    /// Open a past session of the current topic.
    ///
    /// No fallback session is created when the selection is unusable; the
    /// selection is dropped and the error returned.
    pub async fn select_history_session(&self, session_id: SessionId) -> Result<Session, SessionError> {
        let topic = self.current_topic().ok_or(SessionError::NoTopic)?;
        self.history.select(&topic, session_id);
        let generation = self.reset_for(&topic).await;
        let result = self.negotiate(topic.clone(), generation).await;
        if result.is_err() {
            self.history.clear_selection(&topic);
        }
        result
    }

    /// Drop the history selection and continue the latest session.
    pub async fn clear_history_selection(&self) -> Result<Session, SessionError> {
        let topic = self.current_topic().ok_or(SessionError::NoTopic)?;
        self.history.clear_selection(&topic);
        let generation = self.reset_for(&topic).await;
        self.negotiate(topic, generation).await
    }

    /// Abandon the current session and have the server create a new one.
    pub async fn start_new_conversation(&self) -> Result<Session, SessionError> {
        let topic = self.current_topic().ok_or(SessionError::NoTopic)?;
        self.history.clear_selection(&topic);
        let generation = self.reset_for(&topic).await;
        self.store.clear(&topic).await;

        self.publish(generation, NegotiationState::Recreating);
        let result = with_retry(self.retry, "create_session", || {
            self.remote.create_session(&topic)
        })
        .await;

        let session = match result {
            Ok(session) => session,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Could not start a new conversation");
                let err = SessionError::Acquisition(e);
                self.publish(generation, NegotiationState::Failed(err.clone()));
                return Err(err);
            }
        };
        if !self.is_current(generation) {
            return Err(SessionError::Superseded(topic));
        }

        self.store.store(&topic, &session.id).await;
        self.cache.replace(&topic, &session.id, Vec::new());
        info!(topic = %topic, session_id = %session.id, "Started new conversation");
        self.install(&topic, session.clone(), generation);
        Ok(session)
    }

    /// Send a message in the current session.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, SendError> {
        let (topic, session_id) = {
            let current = self.lock_current();
            match (&current.topic, &current.session) {
                (Some(topic), Some(session)) => (topic.clone(), session.id.clone()),
                _ => return Err(SendError::NoSession),
            }
        };

        let outcome = self.mutator.send(&topic, &session_id, text).await?;

        match &outcome.moved_to {
            Some(moved) => {
                let adopted = {
                    let mut current = self.lock_current();
                    let same_session = current.topic.as_ref() == Some(&topic)
                        && current.session.as_ref().map(|s| &s.id) == Some(&session_id);
                    if same_session {
                        current.session = Some(moved.clone());
                    }
                    same_session
                };
                if adopted {
                    info!(
                        topic = %topic,
                        from = %session_id,
                        to = %moved.id,
                        "Adopted session from send response"
                    );
                    self.store.store(&topic, &moved.id).await;
                    self.state.send_replace(NegotiationState::Ready(moved.clone()));
                }
            }
            None => {
                self.store.touch(&topic).await;
            }
        }
        Ok(outcome)
    }

    /// Report a user interaction. Ignored when no session is ready.
    pub fn record_activity(&self, event: ActivityEvent) {
        if let Some(tracker) = &self.lock_current().tracker {
            tracker.record(event);
        }
    }

    /// List past sessions of the current topic.
    pub async fn list_history(&self, query: &HistoryQuery) -> Result<SessionHistory, HistoryError> {
        let topic = self.current_topic().ok_or(HistoryError::NoTopic)?;
        self.history.list_sessions(&topic, query).await
    }

    /// Retitle a session of the current topic.
    pub async fn rename_session(&self, session_id: &SessionId, title: &str) -> Result<Session, HistoryError> {
        let topic = self.current_topic().ok_or(HistoryError::NoTopic)?;
        let renamed = self.history.rename_session(&topic, session_id, title).await?;

        let mut current = self.lock_current();
        if current.topic.as_ref() == Some(&topic) {
            if let Some(session) = current.session.as_mut().filter(|s| &s.id == session_id) {
                session.title = renamed.title.clone();
            }
        }
        Ok(renamed)
    }

    /// Delete a session of the current topic on the server.
    ///
    /// Its cached messages and any local record pointing at it are dropped.
    /// Deleting the current session leaves no session open until the next
    /// switch.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), HistoryError> {
        let topic = self.current_topic().ok_or(HistoryError::NoTopic)?;
        self.history.delete_session(&topic, session_id).await?;

        self.cache.clear(&topic, session_id);
        if self
            .store
            .get(&topic)
            .await
            .is_some_and(|record| &record.session_id == session_id)
        {
            self.store.clear(&topic).await;
        }

        let was_current = {
            let current = self.lock_current();
            current.topic.as_ref() == Some(&topic)
                && current.session.as_ref().is_some_and(|s| &s.id == session_id)
        };
        if was_current {
            let generation = self.reset_for(&topic).await;
            self.publish(generation, NegotiationState::Idle);
            info!(topic = %topic, session_id = %session_id, "Deleted the open session");
        }
        Ok(())
    }

    /// Messages of the current session, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        let current = self.lock_current();
        match (&current.topic, &current.session) {
            (Some(topic), Some(session)) => self.cache.get(topic, &session.id),
            _ => Vec::new(),
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock_current().session.clone()
    }

    pub fn current_topic(&self) -> Option<TopicId> {
        self.lock_current().topic.clone()
    }

    /// Session explicitly selected for the current topic, if any.
    pub fn selection(&self) -> Option<SessionId> {
        self.current_topic()
            .and_then(|topic| self.history.selection(&topic))
    }

    pub fn state(&self) -> NegotiationState {
        self.state.borrow().clone()
    }

    /// Watch negotiation state changes.
    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &Arc<LocalActivityStore<K>> {
        &self.store
    }

    /// Stop the tracker and the sweeper.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tracker = self.lock_current().tracker.take();
        if let Some(tracker) = tracker {
            tracker.detach().await;
        }
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }
        debug!("Chat controller shut down");
    }

    async fn negotiate(&self, topic: TopicId, generation: u64) -> Result<Session, SessionError> {
        let selected = self.history.selection(&topic);
        let progress = |state: NegotiationState| self.publish(generation, state);
        let result = self
            .negotiator
            .negotiate(&topic, selected.as_ref(), &progress)
            .await;

        if !self.is_current(generation) {
            debug!(topic = %topic, "Discarding superseded negotiation");
            return Err(SessionError::Superseded(topic));
        }
        let Negotiated { session, outcome } = result?;
        debug!(topic = %topic, session_id = %session.id, ?outcome, "Negotiated session");

        self.load_messages(&topic, &session).await;
        if !self.is_current(generation) {
            return Err(SessionError::Superseded(topic));
        }
        self.install(&topic, session.clone(), generation);
        Ok(session)
    }

    /// Populate the cache from the server. A failed fetch leaves it empty.
    async fn load_messages(&self, topic: &TopicId, session: &Session) {
        match self.remote.list_messages(topic, Some(&session.id)).await {
            Ok(list) => {
                debug!(
                    topic = %topic,
                    session_id = %session.id,
                    count = list.messages.len(),
                    "Loaded messages"
                );
                self.cache.replace(topic, &session.id, list.messages);
            }
            Err(e) => {
                warn!(topic = %topic, session_id = %session.id, error = %e, "Could not load messages");
                self.cache.replace(topic, &session.id, Vec::new());
            }
        }
    }

    /// Make `session` current and attach a fresh tracker.
    fn install(&self, topic: &TopicId, session: Session, generation: u64) {
        let tracker = TrackerHandle::attach(
            self.store.clone(),
            topic.clone(),
            self.activity_throttle,
            &self.cancel,
        );
        {
            let mut current = self.lock_current();
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            current.session = Some(session.clone());
            // Replacing drops (and so cancels) any previous tracker.
            current.tracker = Some(tracker);
        }
        self.publish(generation, NegotiationState::Ready(session));
    }

    /// Detach the tracker and forget the session before renegotiating the
    /// same topic. Returns the new generation.
    async fn reset_for(&self, topic: &TopicId) -> u64 {
        let generation = self.next_generation();
        let previous = {
            let mut current = self.lock_current();
            current.topic = Some(topic.clone());
            current.session = None;
            current.tracker.take()
        };
        if let Some(tracker) = previous {
            tracker.detach().await;
        }
        generation
    }

    fn publish(&self, generation: u64, state: NegotiationState) {
        if self.is_current(generation) {
            self.state.send_replace(state);
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_current(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<R, K> Drop for ChatController<R, K>
where
    R: SessionRemote + 'static,
    K: KvStore + 'static,
{
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<R, K> std::fmt::Debug for ChatController<R, K>
where
    R: SessionRemote + 'static,
    K: KvStore + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.lock_current();
        f.debug_struct("ChatController")
            .field("topic", &current.topic)
            .field("session", &current.session.as_ref().map(|s| &s.id))
            .field("state", &self.state.borrow().label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::memory::InMemoryKvStore;
    use crate::testing::{Call, FakeRemote, SendReply, ValidateReply, confirmed};
    use chrono::Utc;
    use parley_types::error::RemoteError;
    use parley_types::message::MessageRole;

    type Controller = ChatController<FakeRemote, InMemoryKvStore>;

    fn setup() -> (Arc<FakeRemote>, Arc<ManualClock>, Controller) {
        let remote = Arc::new(FakeRemote::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = ParleyConfig::default();
        let store = Arc::new(
            LocalActivityStore::new(InMemoryKvStore::new(), config.inactivity_timeout())
                .with_clock(clock.clone()),
        );
        let controller = ChatController::new(remote.clone(), store, &config);
        (remote, clock, controller)
    }

    #[tokio::test]
    async fn test_open_topic_reaches_ready_and_loads_messages() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        remote.seed_messages(
            "100",
            vec![
                confirmed(1, &SessionId::new("100"), MessageRole::User, "hi"),
                confirmed(2, &SessionId::new("100"), MessageRole::Assistant, "hello"),
            ],
        );

        let session = controller.open_topic(topic.clone()).await.unwrap();
        assert_eq!(session.id.as_str(), "100");
        assert!(matches!(controller.state(), NegotiationState::Ready(_)));
        assert_eq!(controller.messages().len(), 2);
        assert_eq!(
            remote.calls(),
            vec![
                Call::GetOrCreate,
                Call::ListMessages(Some(SessionId::new("100")))
            ]
        );
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_reopen_resumes_stored_session() {
        let (remote, clock, controller) = setup();
        let topic = TopicId::new("7");
        let first = controller.open_topic(topic.clone()).await.unwrap();

        remote.seed_messages(
            first.id.as_str(),
            vec![
                confirmed(1, &first.id, MessageRole::User, "earlier"),
                confirmed(2, &first.id, MessageRole::Assistant, "noted"),
            ],
        );

        clock.advance(chrono::Duration::minutes(2));
        let again = controller.open_topic(topic).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(remote.count(|c| matches!(c, Call::Validate(_))), 1);
        assert_eq!(remote.count(|c| *c == Call::GetOrCreate), 1, "only the first open");
        assert_eq!(
            remote.calls().last(),
            Some(&Call::ListMessages(Some(first.id.clone())))
        );
        let contents: Vec<String> = controller.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["earlier", "noted"]);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_with_selection_skips_default_flow() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        let picked = SessionId::new("9");
        remote.seed_messages("9", vec![confirmed(1, &picked, MessageRole::User, "old")]);

        let session = controller
            .open_topic_with_selection(topic.clone(), Some(picked.clone()))
            .await
            .unwrap();
        assert_eq!(session.id, picked);
        assert_eq!(controller.selection(), Some(picked.clone()));
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(remote.count(|c| *c == Call::GetOrCreate), 0);
        assert_eq!(
            remote.calls(),
            vec![Call::Validate(picked.clone()), Call::ListMessages(Some(picked))]
        );
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_with_invalid_selection_fails_without_fallback() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        remote.on_validate("9", ValidateReply::Rejected);

        let err = controller
            .open_topic_with_selection(topic.clone(), Some(SessionId::new("9")))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SelectedSessionInvalid(_)));
        assert_eq!(controller.current_topic(), Some(topic));
        assert_eq!(controller.current_session(), None);
        assert_eq!(controller.selection(), None);
        assert_eq!(remote.calls(), vec![Call::Validate(SessionId::new("9"))]);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_without_session_is_rejected() {
        let (remote, _clock, controller) = setup();
        let err = controller.send("hello").await.unwrap_err();
        assert!(matches!(err, SendError::NoSession));
        assert!(remote.calls().is_empty());
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_refreshes_activity() {
        let (_remote, clock, controller) = setup();
        let topic = TopicId::new("7");
        controller.open_topic(topic.clone()).await.unwrap();

        clock.advance(chrono::Duration::minutes(4));
        controller.send("hello").await.unwrap();

        // Without the post-send touch this record would have expired.
        clock.advance(chrono::Duration::minutes(4));
        assert!(controller.store().get(&topic).await.is_some());
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_adopts_moved_session() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        controller.open_topic(topic.clone()).await.unwrap();
        remote.on_send(SendReply::MovedTo(SessionId::new("555")));

        controller.send("hello").await.unwrap();
        assert_eq!(controller.current_session().unwrap().id.as_str(), "555");
        assert_eq!(controller.messages().len(), 2);
        assert_eq!(
            controller.store().get(&topic).await.unwrap().session_id.as_str(),
            "555"
        );
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_selection_surfaces_error_without_new_session() {
        let (remote, _clock, controller) = setup();
        controller.open_topic(TopicId::new("7")).await.unwrap();
        remote.on_validate("9", ValidateReply::Rejected);

        let err = controller
            .select_history_session(SessionId::new("9"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SelectedSessionInvalid(_)));
        assert!(matches!(controller.state(), NegotiationState::Failed(_)));
        assert_eq!(controller.current_session(), None);
        assert_eq!(controller.selection(), None);
        assert_eq!(remote.count(|c| *c == Call::GetOrCreate), 1, "only the initial open");
        assert_eq!(remote.count(|c| *c == Call::Create), 0);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_clear_selection_continues_from_local_record() {
        let (_remote, _clock, controller) = setup();
        let latest = controller.open_topic(TopicId::new("7")).await.unwrap();

        let picked = controller
            .select_history_session(SessionId::new("9"))
            .await
            .unwrap();
        assert_eq!(picked.id.as_str(), "9");
        assert_eq!(controller.selection(), Some(SessionId::new("9")));

        // The store now remembers "9", which validates as live.
        let resumed = controller.clear_history_selection().await.unwrap();
        assert_eq!(resumed.id.as_str(), "9");
        assert_ne!(resumed.id, latest.id);
        assert_eq!(controller.selection(), None);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_new_conversation_creates_session() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        let old = controller.open_topic(topic.clone()).await.unwrap();

        let new = controller.start_new_conversation().await.unwrap();
        assert_ne!(old.id, new.id);
        assert_eq!(remote.count(|c| *c == Call::Create), 1);
        assert!(controller.messages().is_empty());
        assert_eq!(
            controller.store().get(&topic).await.unwrap().session_id,
            new.id
        );
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_new_conversation_leaves_no_session() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        controller.open_topic(topic.clone()).await.unwrap();
        remote.fail_acquire([RemoteError::Status {
            status: 500,
            message: "boom".into(),
        }]);

        let err = controller.start_new_conversation().await.unwrap_err();
        assert!(matches!(err, SessionError::Acquisition(_)));
        assert_eq!(controller.current_session(), None);
        assert!(controller.store().get(&topic).await.is_none());
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_switch_discards_stale_negotiation() {
        let (remote, _clock, controller) = setup();
        let controller = Arc::new(controller);
        let slow = TopicId::new("slow");

        // Seed a record for the slow topic whose validation hangs.
        controller.store().store(&slow, &SessionId::new("42")).await;
        remote.on_validate("42", ValidateReply::Hang);

        let pending = {
            let controller = controller.clone();
            let slow = slow.clone();
            tokio::spawn(async move { controller.open_topic(slow).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let fast = controller.open_topic(TopicId::new("fast")).await.unwrap();
        let stale = pending.await.unwrap();

        assert!(matches!(stale, Err(SessionError::Superseded(_))));
        assert_eq!(controller.current_topic(), Some(TopicId::new("fast")));
        assert_eq!(controller.current_session().unwrap().id, fast.id);
        assert!(matches!(controller.state(), NegotiationState::Ready(ref s) if s.id == fast.id));
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_record_activity_without_session_is_ignored() {
        let (_remote, _clock, controller) = setup();
        controller.record_activity(ActivityEvent::KeyPress);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_history_requires_topic() {
        let (_remote, _clock, controller) = setup();
        let err = controller
            .list_history(&HistoryQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::NoTopic));
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_rename_updates_current_session_title() {
        let (remote, _clock, controller) = setup();
        let session = controller.open_topic(TopicId::new("7")).await.unwrap();

        let renamed = controller.rename_session(&session.id, "Photosynthesis").await.unwrap();
        assert_eq!(renamed.title.as_deref(), Some("Photosynthesis"));
        assert_eq!(
            controller.current_session().unwrap().display_title(),
            "Photosynthesis"
        );
        assert_eq!(
            remote.calls().last(),
            Some(&Call::Rename(session.id, "Photosynthesis".into()))
        );
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_current_session_forgets_it() {
        let (remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        let session = controller.open_topic(topic.clone()).await.unwrap();
        controller.send("hello").await.unwrap();
        assert_eq!(controller.messages().len(), 2);

        controller.delete_session(&session.id).await.unwrap();
        assert_eq!(remote.calls().last(), Some(&Call::Delete(session.id.clone())));
        assert_eq!(controller.current_session(), None);
        assert_eq!(controller.current_topic(), Some(topic.clone()));
        assert!(controller.messages().is_empty());
        assert!(controller.store().get(&topic).await.is_none());
        assert!(matches!(controller.state(), NegotiationState::Idle));
        assert!(matches!(controller.send("again").await, Err(SendError::NoSession)));

        // The next switch acquires a fresh session.
        let next = controller.clear_history_selection().await.unwrap();
        assert_ne!(next.id, session.id);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_other_session_keeps_current() {
        let (_remote, _clock, controller) = setup();
        let topic = TopicId::new("7");
        let session = controller.open_topic(topic.clone()).await.unwrap();

        controller.delete_session(&SessionId::new("9")).await.unwrap();
        assert_eq!(controller.current_session().unwrap().id, session.id);
        assert_eq!(
            controller.store().get(&topic).await.unwrap().session_id,
            session.id
        );
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_current_session() {
        let (remote, _clock, controller) = setup();
        let session = controller.open_topic(TopicId::new("7")).await.unwrap();
        remote.fail_manage([RemoteError::Status {
            status: 403,
            message: "forbidden".into(),
        }]);

        let err = controller.delete_session(&session.id).await.unwrap_err();
        assert!(matches!(err, HistoryError::Remote(_)));
        assert_eq!(controller.current_session().unwrap().id, session.id);
        controller.shutdown().await;
    }
}
