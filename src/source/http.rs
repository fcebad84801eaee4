//! HTTP Board Gateway Source
//!
//! Talks to a board gateway that exposes the board's fetch-by-index
//! primitive over JSON:
//! - `POST   /v1/session`                       login, returns `{"token": ...}`
//! - `DELETE /v1/session`                       logout
//! - `GET    /v1/boards/{board}/newest`         `{"newest_index": n}`
//! - `GET    /v1/boards/{board}/posts/{index}`  one entry, 404/410 when deleted
//!
//! Both board endpoints accept an optional `keyword=` or `author=` search.
//! The gateway throttles on its side; this client never retries by itself
//! (see `RetryingSource`).

use super::*;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// HTTP gateway source
pub struct HttpSource {
    client: Client,
    config: HttpSourceConfig,
}

/// Configuration for the gateway client
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Gateway base URL, e.g. "http://localhost:8090"
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    pub user_agent: String,
    /// Searches the gateway evaluates natively
    pub capabilities: SourceCapabilities,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            request_timeout_ms: 30_000,
            user_agent: format!("Boardsift/{}", env!("CARGO_PKG_VERSION")),
            capabilities: SourceCapabilities::all(),
        }
    }
}

impl From<&SourceConfig> for HttpSourceConfig {
    fn from(config: &SourceConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout_ms: config.request_timeout_secs * 1000,
            user_agent: config.user_agent.clone(),
            capabilities: SourceCapabilities {
                keyword_search: config.keyword_search,
                author_search: config.author_search,
            },
        }
    }
}

impl HttpSource {
    /// Create a new gateway client
    pub fn new(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    fn board_url(&self, board: &str, tail: &str) -> String {
        format!(
            "{}/v1/boards/{}/{}",
            self.config.base_url,
            urlencoding::encode(board),
            tail
        )
    }

    fn authorized(
        &self,
        builder: RequestBuilder,
        session: &Session,
        filter: Option<&SearchFilter>,
    ) -> RequestBuilder {
        let builder = builder.bearer_auth(&session.token);
        match filter {
            Some(filter) => builder.query(&[filter.query_pair()]),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SourceError> {
        builder.send().await.map_err(classify)
    }
}

/// Map transport failures onto the source taxonomy
fn classify(e: reqwest::Error) -> SourceError {
    if e.is_timeout() || e.is_connect() {
        SourceError::Transient(e.to_string())
    } else {
        SourceError::Request(e)
    }
}

fn retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(5)
}

/// Errors shared by every endpoint, `None` when the status needs
/// endpoint-specific handling
fn common_error(response: &Response) -> Option<SourceError> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(SourceError::AuthFailed(format!("gateway returned {}", status)))
        }
        StatusCode::TOO_MANY_REQUESTS => Some(SourceError::RateLimited(retry_after(response))),
        s if s.is_server_error() => Some(SourceError::Transient(format!("gateway returned {}", s))),
        _ => None,
    }
}

#[async_trait]
impl EntrySource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.config.capabilities
    }

    fn without_retry(&self) -> &dyn EntrySource {
        self
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError> {
        let url = format!("{}/v1/session", self.config.base_url);
        let body = LoginRequest {
            account: &credentials.account,
            password: &credentials.password,
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        if let Some(err) = common_error(&response) {
            return Err(err);
        }
        if !response.status().is_success() {
            return Err(SourceError::AuthFailed(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        tracing::info!("Logged in to {} as {}", self.config.base_url, credentials.account);
        Ok(Session::new(credentials.account.clone(), login.token))
    }

    async fn logout(&self, session: Session) -> Result<(), SourceError> {
        let url = format!("{}/v1/session", self.config.base_url);
        let response = self
            .send(self.client.delete(&url).bearer_auth(&session.token))
            .await?;

        if let Some(err) = common_error(&response) {
            return Err(err);
        }

        tracing::info!("Logged out {}", session.account);
        Ok(())
    }

    async fn newest_index(
        &self,
        session: &Session,
        board: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64, SourceError> {
        let url = self.board_url(board, "newest");
        let response = self
            .send(self.authorized(self.client.get(&url), session, filter))
            .await?;

        if let Some(err) = common_error(&response) {
            return Err(err);
        }
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NoSuchBoard(board.to_string()));
        }
        if !response.status().is_success() {
            return Err(SourceError::Malformed(format!(
                "newest index returned {}",
                response.status()
            )));
        }

        let newest: NewestResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(newest.newest_index)
    }

    async fn fetch(
        &self,
        session: &Session,
        board: &str,
        index: u64,
        filter: Option<&SearchFilter>,
    ) -> Result<Option<Entry>, SourceError> {
        let url = self.board_url(board, &format!("posts/{}", index));
        let response = self
            .send(self.authorized(self.client.get(&url), session, filter))
            .await?;

        if let Some(err) = common_error(&response) {
            return Err(err);
        }
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::Malformed(format!(
                "post {} returned {}",
                index,
                response.status()
            )));
        }

        let entry: Entry = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(Some(entry))
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    account: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct NewestResponse {
    newest_index: u64,
}
