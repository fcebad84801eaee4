//! In-memory board source
//!
//! Serves boards held in memory. Used by tests, benchmarks and dry runs;
//! deleted entries and flaky indices can be injected, and every fetch is
//! counted so callers can assert on request volume.

use super::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Boards held in memory, slot `i - 1` holding index `i`
pub struct MemorySource {
    boards: HashMap<String, Vec<Option<Entry>>>,
    capabilities: SourceCapabilities,
    /// Remaining injected failures per (board, index); `u32::MAX` never clears
    failures: Mutex<HashMap<(String, u64), u32>>,
    fetches: AtomicUsize,
    password: Option<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            boards: HashMap::new(),
            capabilities: SourceCapabilities::all(),
            failures: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            password: None,
        }
    }

    /// Add a board; entries take indices `1..=n` in the given order
    pub fn with_board(mut self, name: impl Into<String>, entries: Vec<Entry>) -> Self {
        let slots = entries.into_iter().map(Some).collect();
        self.boards.insert(name.into(), slots);
        self
    }

    /// Mark indices of a board as deleted
    pub fn with_deleted(mut self, name: &str, indices: &[u64]) -> Self {
        if let Some(slots) = self.boards.get_mut(name) {
            for &index in indices {
                if let Some(slot) = index.checked_sub(1).and_then(|i| slots.get_mut(i as usize)) {
                    *slot = None;
                }
            }
        }
        self
    }

    /// Make the next `times` fetches of an index fail transiently
    pub fn with_failure(self, name: &str, index: u64, times: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((name.to_string(), index), times);
        }
        self
    }

    /// Make every fetch of an index fail transiently
    pub fn with_permanent_failure(self, name: &str, index: u64) -> Self {
        self.with_failure(name, index, u32::MAX)
    }

    pub fn with_capabilities(mut self, capabilities: SourceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Require this password on login
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Number of `fetch` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// The slots visible under an optional search filter
    fn view(&self, board: &str, filter: Option<&SearchFilter>) -> Result<Vec<Option<Entry>>, SourceError> {
        let slots = self
            .boards
            .get(board)
            .ok_or_else(|| SourceError::NoSuchBoard(board.to_string()))?;

        let Some(filter) = filter else {
            return Ok(slots.clone());
        };

        if !self.capabilities.supports(filter) {
            return Err(SourceError::Malformed(format!("search not supported: {}", filter)));
        }

        Ok(slots
            .iter()
            .flatten()
            .filter(|entry| match filter {
                SearchFilter::Keyword(keyword) => {
                    entry.title.to_lowercase().contains(&keyword.to_lowercase())
                }
                SearchFilter::Author(author) => entry.author_id().eq_ignore_ascii_case(author),
            })
            .cloned()
            .map(Some)
            .collect())
    }

    fn take_failure(&self, board: &str, index: u64) -> bool {
        let Ok(mut failures) = self.failures.lock() else {
            return false;
        };

        match failures.get_mut(&(board.to_string(), index)) {
            Some(remaining) if *remaining == u32::MAX => true,
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntrySource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities
    }

    fn without_retry(&self) -> &dyn EntrySource {
        self
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError> {
        if let Some(expected) = &self.password {
            if &credentials.password != expected {
                return Err(SourceError::AuthFailed(format!(
                    "wrong password for {}",
                    credentials.account
                )));
            }
        }

        Ok(Session::new(
            credentials.account.clone(),
            format!("memory-{}", Uuid::new_v4()),
        ))
    }

    async fn logout(&self, _session: Session) -> Result<(), SourceError> {
        Ok(())
    }

    async fn newest_index(
        &self,
        session: &Session,
        board: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64, SourceError> {
        if session.token.is_empty() {
            return Err(SourceError::NotAuthenticated);
        }

        Ok(self.view(board, filter)?.len() as u64)
    }

    async fn fetch(
        &self,
        session: &Session,
        board: &str,
        index: u64,
        filter: Option<&SearchFilter>,
    ) -> Result<Option<Entry>, SourceError> {
        if session.token.is_empty() {
            return Err(SourceError::NotAuthenticated);
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.take_failure(board, index) {
            return Err(SourceError::Transient(format!(
                "injected failure at {}#{}",
                board, index
            )));
        }

        let slots = self.view(board, filter)?;
        Ok(index
            .checked_sub(1)
            .and_then(|i| slots.get(i as usize))
            .cloned()
            .flatten())
    }
}
