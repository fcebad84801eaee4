//! Entry Source Adapters
//!
//! A board is only reachable through a slow, rate-limited "fetch by index"
//! primitive. This module normalizes that primitive behind the
//! [`EntrySource`] trait:
//! - HTTP board gateway ([`HttpSource`])
//! - In-memory boards for tests and dry runs ([`MemorySource`])
//! - Bounded retry layered over any source ([`RetryingSource`])
//!
//! There is no ambient session: `login` hands back a [`Session`] value that
//! every later call receives explicitly, and `logout` consumes it.
//! Callers must never issue concurrent requests against one session.

mod http;
mod memory;
mod retry;

pub use http::{HttpSource, HttpSourceConfig};
pub use memory::MemorySource;
pub use retry::{RetryPolicy, RetryingSource};

use crate::config::SourceConfig;
use crate::model::Entry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Common trait for all board sources
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Which search filters the source can evaluate natively
    fn capabilities(&self) -> SourceCapabilities;

    /// This source with any retry layer peeled off
    fn without_retry(&self) -> &dyn EntrySource;

    /// Open a session
    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError>;

    /// Close a session
    async fn logout(&self, session: Session) -> Result<(), SourceError>;

    /// Current upper bound of the board, or of the search result set when a
    /// filter is given
    async fn newest_index(
        &self,
        session: &Session,
        board: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64, SourceError>;

    /// Fetch one entry; `Ok(None)` means the entry was deleted
    async fn fetch(
        &self,
        session: &Session,
        board: &str,
        index: u64,
        filter: Option<&SearchFilter>,
    ) -> Result<Option<Entry>, SourceError>;
}

/// A server-side search the source may apply before indexing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchFilter {
    /// Title keyword search
    Keyword(String),
    /// Exact author search
    Author(String),
}

impl SearchFilter {
    /// Query-string pair understood by the board gateway
    pub fn query_pair(&self) -> (&'static str, &str) {
        match self {
            Self::Keyword(keyword) => ("keyword", keyword),
            Self::Author(author) => ("author", author),
        }
    }
}

impl std::fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword(keyword) => write!(f, "keyword={}", keyword),
            Self::Author(author) => write!(f, "author={}", author),
        }
    }
}

/// Search filters a source can evaluate natively
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCapabilities {
    pub keyword_search: bool,
    pub author_search: bool,
}

impl SourceCapabilities {
    pub fn all() -> Self {
        Self {
            keyword_search: true,
            author_search: true,
        }
    }

    pub fn supports(&self, filter: &SearchFilter) -> bool {
        match filter {
            SearchFilter::Keyword(_) => self.keyword_search,
            SearchFilter::Author(_) => self.author_search,
        }
    }
}

/// Account credentials
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }

    /// Load credentials from a JSON file: `{"account": ..., "password": ...}`
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SourceError::Malformed(format!("credentials file {:?}: {}", path, e))
        })
    }

    /// Read `BOARDSIFT_ACCOUNT` / `BOARDSIFT_PASSWORD`
    pub fn from_env() -> Option<Self> {
        let account = std::env::var("BOARDSIFT_ACCOUNT").ok()?;
        let password = std::env::var("BOARDSIFT_PASSWORD").ok()?;
        Some(Self { account, password })
    }

    /// Environment first, then the credentials file
    pub fn resolve(path: &Path) -> Result<Self, SourceError> {
        match Self::from_env() {
            Some(credentials) => Ok(credentials),
            None => Self::load(path),
        }
    }
}

/// An authenticated session handed out by `EntrySource::login`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub account: String,
    /// Opaque token presented on every request
    pub token: String,
    pub opened_at: DateTime<Utc>,
}

impl Session {
    pub fn new(account: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: account.into(),
            token: token.into(),
            opened_at: Utc::now(),
        }
    }
}

/// Outcome of fetching a single index
#[derive(Debug)]
pub enum Fetched {
    Entry(Entry),
    /// Deleted entry, a normal value rather than an error
    Missing,
    /// The fetch failed; callers log and move on
    Failed(SourceError),
}

/// A source bound to one session and one board
///
/// This is the `fetch(index)` / `newest_index(filter)` view the pipeline
/// stages work against.
#[derive(Clone, Copy)]
pub struct BoardReader<'a> {
    source: &'a dyn EntrySource,
    session: &'a Session,
    board: &'a str,
}

impl<'a> BoardReader<'a> {
    pub fn new(source: &'a dyn EntrySource, session: &'a Session, board: &'a str) -> Self {
        Self {
            source,
            session,
            board,
        }
    }

    pub fn board(&self) -> &str {
        self.board
    }

    /// The same view over the source without retry
    ///
    /// The sampler reads through this: a failed sample is skipped, never
    /// fetched again.
    pub fn without_retry(&self) -> BoardReader<'a> {
        Self {
            source: self.source.without_retry(),
            ..*self
        }
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        self.source.capabilities()
    }

    pub async fn newest_index(&self, filter: Option<&SearchFilter>) -> Result<u64, SourceError> {
        self.source.newest_index(self.session, self.board, filter).await
    }

    /// Fetch one index
    ///
    /// Under a search filter `index` is a position in the search results,
    /// while the returned entry keeps the board index the source reports for
    /// it. The fetch index is only filled in when the source reports none.
    pub async fn fetch(&self, index: u64, filter: Option<&SearchFilter>) -> Fetched {
        match self.source.fetch(self.session, self.board, index, filter).await {
            Ok(Some(mut entry)) => {
                if entry.index == 0 {
                    entry.index = index;
                }
                Fetched::Entry(entry)
            }
            Ok(None) => Fetched::Missing,
            Err(e) => Fetched::Failed(e),
        }
    }
}

/// Build the configured source: the HTTP gateway wrapped in bounded retry
pub fn connect(config: &SourceConfig) -> Result<Arc<dyn EntrySource>, SourceError> {
    let http = HttpSource::new(HttpSourceConfig::from(config))?;
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        base_delay_ms: config.retry_base_delay_ms,
    };

    Ok(Arc::new(RetryingSource::new(http, policy)))
}

/// Errors that can occur while talking to a board source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("No such board: {0}")]
    NoSuchBoard(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not logged in")]
    NotAuthenticated,
}

impl SourceError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) | Self::RateLimited(_) => true,
            Self::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
