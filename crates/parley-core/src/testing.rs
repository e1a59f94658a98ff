//! Scripted `SessionRemote` fake shared by core tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parley_types::error::{RemoteError, StorageError};
use parley_types::history::{HistoryQuery, SessionHistory};
use parley_types::message::{Message, MessageId, MessageRole};
use parley_types::remote::{MessageList, SendMessageRequest, SendMessageResponse, Validation};
use parley_types::session::{Session, SessionId, SessionStatus, TopicId};

use crate::remote::SessionRemote;
use crate::storage::kv_store::KvStore;
use crate::storage::memory::InMemoryKvStore;

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetOrCreate,
    Create,
    Validate(SessionId),
    ListMessages(Option<SessionId>),
    Send(SendMessageRequest),
    History(HistoryQuery),
    Rename(SessionId, String),
    Delete(SessionId),
}

/// How the fake answers a validation request.
#[derive(Debug, Clone)]
pub enum ValidateReply {
    Live,
    Rejected,
    /// `valid: true` but the session is archived.
    Inactive,
    Fail(RemoteError),
    /// Never answers within any sane timeout.
    Hang,
}

/// How the fake answers a send.
#[derive(Debug, Clone)]
pub enum SendReply {
    Ok,
    Fail(RemoteError),
    /// Succeeds and reports that the server moved the conversation.
    MovedTo(SessionId),
    /// Succeeds after a delay.
    Delayed(Duration),
    /// Fails after a delay.
    DelayedFail(Duration, RemoteError),
}

pub fn session(id: &str, topic: &TopicId) -> Session {
    let now = Utc::now();
    Session {
        id: SessionId::new(id),
        topic_id: topic.clone(),
        status: SessionStatus::Active,
        is_active: true,
        title: None,
        message_count: 0,
        created_at: now,
        updated_at: now,
        last_activity: Some(now),
    }
}

pub fn confirmed(id: i64, session_id: &SessionId, role: MessageRole, content: &str) -> Message {
    Message {
        id: MessageId::Confirmed(id),
        session_id: session_id.clone(),
        role,
        content: content.to_string(),
        timestamp: Utc::now(),
    }
}

pub struct FakeRemote {
    calls: Mutex<Vec<Call>>,
    next_session: AtomicI64,
    next_message: AtomicI64,
    validate: Mutex<HashMap<SessionId, ValidateReply>>,
    acquire_failures: Mutex<VecDeque<RemoteError>>,
    sends: Mutex<VecDeque<SendReply>>,
    messages: Mutex<HashMap<SessionId, Vec<Message>>>,
    history: Mutex<Vec<Session>>,
    current: Mutex<Option<Session>>,
    manage_failures: Mutex<VecDeque<RemoteError>>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_session: AtomicI64::new(100),
            next_message: AtomicI64::new(101),
            validate: Mutex::new(HashMap::new()),
            acquire_failures: Mutex::new(VecDeque::new()),
            sends: Mutex::new(VecDeque::new()),
            messages: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            manage_failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn on_validate(&self, id: &str, reply: ValidateReply) {
        self.validate
            .lock()
            .unwrap()
            .insert(SessionId::new(id), reply);
    }

    /// Queue errors returned by the next acquisition calls.
    pub fn fail_acquire(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.acquire_failures.lock().unwrap().extend(errors);
    }

    pub fn on_send(&self, reply: SendReply) {
        self.sends.lock().unwrap().push_back(reply);
    }

    pub fn seed_messages(&self, id: &str, messages: Vec<Message>) {
        self.messages
            .lock()
            .unwrap()
            .insert(SessionId::new(id), messages);
    }

    /// Queue errors returned by the next rename or delete calls.
    pub fn fail_manage(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.manage_failures.lock().unwrap().extend(errors);
    }

    pub fn seed_history(&self, sessions: Vec<Session>) {
        *self.history.lock().unwrap() = sessions;
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fresh_session(&self, topic: &TopicId) -> Session {
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        session(&id.to_string(), topic)
    }

    fn next_message_id(&self) -> i64 {
        self.next_message.fetch_add(1, Ordering::SeqCst)
    }
}

impl SessionRemote for FakeRemote {
    async fn get_or_create_session(&self, topic: &TopicId) -> Result<Session, RemoteError> {
        self.record(Call::GetOrCreate);
        if let Some(e) = self.acquire_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let mut current = self.current.lock().unwrap();
        let session = current
            .get_or_insert_with(|| self.fresh_session(topic))
            .clone();
        Ok(session)
    }

    async fn create_session(&self, topic: &TopicId) -> Result<Session, RemoteError> {
        self.record(Call::Create);
        if let Some(e) = self.acquire_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let session = self.fresh_session(topic);
        *self.current.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn validate_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
    ) -> Result<Validation, RemoteError> {
        self.record(Call::Validate(session_id.clone()));
        let reply = self
            .validate
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or(ValidateReply::Live);
        match reply {
            ValidateReply::Live => Ok(Validation {
                valid: true,
                session: Some(session(session_id.as_str(), topic)),
            }),
            ValidateReply::Rejected => Ok(Validation {
                valid: false,
                session: None,
            }),
            ValidateReply::Inactive => {
                let mut s = session(session_id.as_str(), topic);
                s.status = SessionStatus::Archived;
                s.is_active = false;
                Ok(Validation {
                    valid: true,
                    session: Some(s),
                })
            }
            ValidateReply::Fail(e) => Err(e),
            ValidateReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RemoteError::Timeout)
            }
        }
    }

    async fn list_messages(
        &self,
        _topic: &TopicId,
        session_id: Option<&SessionId>,
    ) -> Result<MessageList, RemoteError> {
        self.record(Call::ListMessages(session_id.cloned()));
        let messages = session_id
            .and_then(|id| self.messages.lock().unwrap().get(id).cloned())
            .unwrap_or_default();
        Ok(MessageList {
            messages,
            session: None,
        })
    }

    async fn send_message(
        &self,
        topic: &TopicId,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, RemoteError> {
        self.record(Call::Send(request.clone()));
        let reply = self
            .sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendReply::Ok);

        let mut session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| SessionId::new("0"));
        let mut moved = None;
        match reply {
            SendReply::Ok => {}
            SendReply::Fail(e) => return Err(e),
            SendReply::MovedTo(id) => {
                session_id = id.clone();
                moved = Some(session(id.as_str(), topic));
            }
            SendReply::Delayed(delay) => tokio::time::sleep(delay).await,
            SendReply::DelayedFail(delay, e) => {
                tokio::time::sleep(delay).await;
                return Err(e);
            }
        }

        let user = confirmed(
            self.next_message_id(),
            &session_id,
            MessageRole::User,
            &request.content,
        );
        let assistant = confirmed(
            self.next_message_id(),
            &session_id,
            MessageRole::Assistant,
            &format!("re: {}", request.content),
        );
        Ok(SendMessageResponse {
            user_message: user,
            assistant_message: assistant,
            session: moved,
        })
    }

    async fn list_session_history(
        &self,
        _topic: &TopicId,
        query: &HistoryQuery,
    ) -> Result<SessionHistory, RemoteError> {
        self.record(Call::History(query.clone()));
        let sessions = self.history.lock().unwrap().clone();
        let active_count = sessions.iter().filter(|s| s.is_live()).count() as u32;
        Ok(SessionHistory {
            total_count: sessions.len() as u32,
            active_count,
            sessions,
        })
    }

    async fn rename_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
        title: &str,
    ) -> Result<Session, RemoteError> {
        self.record(Call::Rename(session_id.clone(), title.to_string()));
        if let Some(e) = self.manage_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let mut renamed = session(session_id.as_str(), topic);
        renamed.title = Some(title.to_string());
        for s in self.history.lock().unwrap().iter_mut() {
            if &s.id == session_id {
                s.title = Some(title.to_string());
            }
        }
        Ok(renamed)
    }

    async fn delete_session(&self, _topic: &TopicId, session_id: &SessionId) -> Result<(), RemoteError> {
        self.record(Call::Delete(session_id.clone()));
        if let Some(e) = self.manage_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        self.history.lock().unwrap().retain(|s| &s.id != session_id);
        self.messages.lock().unwrap().remove(session_id);
        let mut current = self.current.lock().unwrap();
        if current.as_ref().is_some_and(|s| &s.id == session_id) {
            *current = None;
        }
        Ok(())
    }
}

/// In-memory `KvStore` that keeps a log of every write.
#[derive(Default)]
pub struct RecordingKv {
    inner: InMemoryKvStore,
    writes: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingKv {
    pub fn writes(&self) -> Vec<(String, serde_json::Value)> {
        self.writes.lock().unwrap().clone()
    }
}

impl KvStore for RecordingKv {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list_keys(prefix).await
    }
}
