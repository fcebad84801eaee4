//! Bounded retry layered over any source
//!
//! Pipeline stages never retry on their own: a failed index is logged and
//! skipped. `RetryingSource` retries transient failures with quadratic
//! backoff and honours rate-limit hints; missing entries and non-transient
//! errors pass through untouched. The sampler reads through
//! [`EntrySource::without_retry`], so only dense, single and calendar
//! fetches are retried.

use super::*;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Retry tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n² × base_delay_ms`
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    fn delay(&self, attempt: u32, error: &SourceError) -> Duration {
        match error {
            SourceError::RateLimited(secs) => Duration::from_secs(*secs),
            _ => Duration::from_millis(self.base_delay_ms * u64::from(attempt).pow(2)),
        }
    }
}

/// A source that retries transient failures of the wrapped source
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: EntrySource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.delay(attempt, &e);
                    tracing::debug!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what,
                        e,
                        attempt,
                        self.policy.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<S: EntrySource> EntrySource for RetryingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.inner.capabilities()
    }

    fn without_retry(&self) -> &dyn EntrySource {
        self.inner.without_retry()
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError> {
        self.with_retry("login", || self.inner.login(credentials)).await
    }

    async fn logout(&self, session: Session) -> Result<(), SourceError> {
        self.inner.logout(session).await
    }

    async fn newest_index(
        &self,
        session: &Session,
        board: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64, SourceError> {
        self.with_retry("newest index", || {
            self.inner.newest_index(session, board, filter)
        })
        .await
    }

    async fn fetch(
        &self,
        session: &Session,
        board: &str,
        index: u64,
        filter: Option<&SearchFilter>,
    ) -> Result<Option<Entry>, SourceError> {
        let what = format!("fetch {}#{}", board, index);
        self.with_retry(&what, || self.inner.fetch(session, board, index, filter))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_ms: 1,
        }
    }

    fn source() -> MemorySource {
        MemorySource::new().with_board(
            "Test",
            vec![Entry::new(0, "only", "a", "Sat Oct  4 21:16:48 2025")],
        )
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let source = RetryingSource::new(source().with_failure("Test", 1, 2), policy(2));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();

        let entry = source.fetch(&session, "Test", 1, None).await.unwrap();
        assert!(entry.is_some());
        assert_eq!(source.inner().fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let source = RetryingSource::new(source().with_permanent_failure("Test", 1), policy(2));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();

        let err = source.fetch(&session, "Test", 1, None).await.unwrap_err();
        assert!(matches!(err, SourceError::Transient(_)));
        assert_eq!(source.inner().fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_is_not_retried() {
        let source = RetryingSource::new(source().with_deleted("Test", &[1]), policy(3));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();

        assert!(source.fetch(&session, "Test", 1, None).await.unwrap().is_none());
        assert_eq!(source.inner().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_without_retry_fetches_once() {
        let source = RetryingSource::new(source().with_failure("Test", 1, 1), policy(2));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();

        let err = source
            .without_retry()
            .fetch(&session, "Test", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Transient(_)));
        assert_eq!(source.inner().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_permanent_errors_pass_through() {
        let source = RetryingSource::new(source(), policy(3));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();

        let err = source.newest_index(&session, "Nope", None).await.unwrap_err();
        assert!(matches!(err, SourceError::NoSuchBoard(_)));
    }

    #[test]
    fn test_backoff_is_quadratic() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 100,
        };
        let transient = SourceError::Transient("x".into());

        assert_eq!(policy.delay(1, &transient), Duration::from_millis(100));
        assert_eq!(policy.delay(3, &transient), Duration::from_millis(900));
        assert_eq!(policy.delay(1, &SourceError::RateLimited(4)), Duration::from_secs(4));
    }
}
