//! HttpSessionRemote -- concrete [`SessionRemote`] over the chat session API.
//!
//! Routes live under `/api/subjects/{topic}/chat/`, except renaming and
//! deleting which address `/api/chat/sessions/{id}/`. The optional API token
//! is wrapped in [`secrecy::SecretString`] and only exposed when building
//! the `Authorization` header.

use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use parley_core::remote::SessionRemote;
use parley_types::config::ParleyConfig;
use parley_types::error::RemoteError;
use parley_types::history::{HistoryQuery, SessionHistory};
use parley_types::remote::{MessageList, SendMessageRequest, SendMessageResponse, Validation};
use parley_types::session::{Session, SessionId, TopicId};

use super::types::{
    ErrorBody, HistoryResponse, MessagesResponse, RenameRequest, SendRequest, SendResponse,
    ValidateResponse, WireSession,
};

/// Remote session authority reached over HTTP.
pub struct HttpSessionRemote {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpSessionRemote {
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &ParleyConfig, token: Option<SecretString>) -> Result<Self, RemoteError> {
        Self::new(&config.api_base_url, token, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/api/subjects/{topic}/chat/{segments..}/` with every
    /// segment percent-encoded.
    fn url(&self, topic: &TopicId, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "subjects", topic.as_str(), "chat"])
                .extend(segments)
                .push("");
        }
        url
    }

    /// Build `{base}/api/chat/sessions/{id}/`.
    fn session_url(&self, session_id: &SessionId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "chat", "sessions", session_id.as_str()])
                .push("");
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        builder.send().await.map_err(transport_error)
    }

    async fn json<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, RemoteError> {
        let response = self.execute(builder).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        decode(response).await
    }

    async fn fetch_session(
        &self,
        topic: &TopicId,
        method: Method,
        segments: &[&str],
    ) -> Result<Session, RemoteError> {
        let url = self.url(topic, segments);
        debug!(topic = %topic, %method, %url, "Session request");
        let wire: WireSession = self.json(self.request(method, url)).await?;
        wire.into_session(topic)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_decode() {
        RemoteError::Decode(e.to_string())
    } else {
        RemoteError::Transport(e.to_string())
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> RemoteError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::summary)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

impl std::fmt::Debug for HttpSessionRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSessionRemote")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl SessionRemote for HttpSessionRemote {
    async fn get_or_create_session(&self, topic: &TopicId) -> Result<Session, RemoteError> {
        self.fetch_session(topic, Method::GET, &["sessions", "current"])
            .await
    }

    async fn create_session(&self, topic: &TopicId) -> Result<Session, RemoteError> {
        self.fetch_session(topic, Method::POST, &["session"]).await
    }

    async fn validate_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
    ) -> Result<Validation, RemoteError> {
        let url = self.url(topic, &["sessions", session_id.as_str(), "validate"]);
        let response = self.execute(self.request(Method::GET, url)).await?;
        let status = response.status();

        // 410 Gone carries an explicit `valid: false` verdict.
        if status.is_success() || status == StatusCode::GONE {
            let wire: ValidateResponse = decode(response).await?;
            debug!(
                topic = %topic,
                session_id = %session_id,
                valid = wire.valid,
                reason = wire.message.as_deref().unwrap_or(""),
                "Validation response"
            );
            return wire.into_validation(topic);
        }
        Err(status_error(status, response).await)
    }

    async fn list_messages(
        &self,
        topic: &TopicId,
        session_id: Option<&SessionId>,
    ) -> Result<MessageList, RemoteError> {
        let url = self.url(topic, &["messages"]);
        let mut builder = self.request(Method::GET, url);
        if let Some(id) = session_id {
            builder = builder.query(&[("session_id", id.as_str())]);
        }
        let wire: MessagesResponse = self.json(builder).await?;
        wire.into_list(topic, session_id)
    }

    async fn send_message(
        &self,
        topic: &TopicId,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, RemoteError> {
        let url = self.url(topic, &["messages"]);
        let body = SendRequest {
            message: request.content,
            session_id: request.session_id.as_ref().map(|s| s.as_str().to_string()),
        };
        let wire: SendResponse = self
            .json(self.request(Method::POST, url).json(&body))
            .await?;
        wire.into_response(topic, request.session_id.as_ref())
    }

    async fn list_session_history(
        &self,
        topic: &TopicId,
        query: &HistoryQuery,
    ) -> Result<SessionHistory, RemoteError> {
        let url = self.url(topic, &["sessions"]);
        let mut params: Vec<(&str, String)> =
            vec![("limit", query.effective_limit().to_string())];
        if let Some(status) = query.status {
            params.push(("status", status.to_string()));
        }
        if let Some(include) = query.include_inactive {
            params.push(("include_inactive", include.to_string()));
        }
        let wire: HistoryResponse = self
            .json(self.request(Method::GET, url).query(&params))
            .await?;
        wire.into_history(topic)
    }

    async fn rename_session(
        &self,
        topic: &TopicId,
        session_id: &SessionId,
        title: &str,
    ) -> Result<Session, RemoteError> {
        let url = self.session_url(session_id);
        debug!(topic = %topic, session_id = %session_id, %url, "Rename request");
        let wire: WireSession = self
            .json(self.request(Method::PATCH, url).json(&RenameRequest { title }))
            .await?;
        wire.into_session(topic)
    }

    async fn delete_session(&self, topic: &TopicId, session_id: &SessionId) -> Result<(), RemoteError> {
        let url = self.session_url(session_id);
        debug!(topic = %topic, session_id = %session_id, %url, "Delete request");
        let response = self.execute(self.request(Method::DELETE, url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        Ok(())
    }
}
