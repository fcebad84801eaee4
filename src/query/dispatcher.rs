//! Query Dispatcher
//!
//! Runs a [`Query`] against a source, one stage at a time:
//!
//! ```text
//! Start → {DirectFetch | Locate → DenseFetch | CalendarScan | Single} → Filter → Done
//! ```
//!
//! Title and author searches are pushed to the source when it can evaluate
//! them; the exact predicate is always applied to whatever comes back.

use super::ast::{DateRange, Query, QueryKind, Scope};
use super::error::QueryResult;
use crate::crawl::{fetch_range, locate, Sampler, SamplerConfig, StopPolicy, ToleranceStop};
use crate::model::{Entry, IndexBracket, TimeOfDayWindow};
use crate::source::{BoardReader, EntrySource, Fetched, SearchFilter, Session};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Dispatcher tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub sampler: SamplerConfig,
    /// Most indices a calendar scan may visit
    pub calendar_scan_limit: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            calendar_scan_limit: 1000,
        }
    }
}

/// Which path a query took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    DirectFetch,
    Locate,
    CalendarScan,
    Single,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectFetch => write!(f, "direct fetch"),
            Self::Locate => write!(f, "locate"),
            Self::CalendarScan => write!(f, "calendar scan"),
            Self::Single => write!(f, "single"),
        }
    }
}

/// Result of a query run
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Matching entries, ascending by index
    pub entries: Vec<Entry>,
    pub route: Route,
    /// Bracket used by the locate route
    pub bracket: Option<IndexBracket>,
    /// Server-side search applied, if any
    pub pushed_filter: Option<SearchFilter>,
    pub execution_time_ms: u64,
}

impl QueryOutcome {
    fn new(route: Route) -> Self {
        Self {
            entries: Vec::new(),
            route,
            bracket: None,
            pushed_filter: None,
            execution_time_ms: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs queries against one source
pub struct QueryDispatcher {
    source: Arc<dyn EntrySource>,
    config: DispatcherConfig,
    sampler: Sampler,
}

impl QueryDispatcher {
    /// Create a dispatcher with the default early-stop policy
    pub fn new(source: Arc<dyn EntrySource>, config: DispatcherConfig) -> Self {
        Self::with_policy(source, config, Arc::new(ToleranceStop::default()))
    }

    pub fn with_policy(
        source: Arc<dyn EntrySource>,
        config: DispatcherConfig,
        policy: Arc<dyn StopPolicy>,
    ) -> Self {
        Self {
            sampler: Sampler::new(config.sampler, policy),
            source,
            config,
        }
    }

    pub fn source(&self) -> &Arc<dyn EntrySource> {
        &self.source
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run a query and return only its entries
    pub async fn run_query(&self, session: &Session, query: &Query) -> QueryResult<Vec<Entry>> {
        Ok(self.run(session, query).await?.entries)
    }

    /// Run a query
    ///
    /// Configuration problems fail before any fetch. A window that cannot be
    /// bracketed yields an empty outcome, not an error.
    pub async fn run(&self, session: &Session, query: &Query) -> QueryResult<QueryOutcome> {
        query.validate()?;

        let start = Instant::now();
        let reader = BoardReader::new(self.source.as_ref(), session, &query.board);
        let predicate = query.predicate();

        tracing::info!("Running query [{}] via {}", query, self.source.name());

        let mut outcome = match &query.kind {
            QueryKind::Single { index } => self.single(&reader, *index).await,
            QueryKind::CalendarRange(range) => self.calendar_scan(&reader, range).await?,
            _ => {
                let filter = self.push_down(query);
                let scope = query.scope().unwrap_or(Scope::Count(0));
                let mut outcome = match scope {
                    Scope::Count(count) => self.direct_fetch(&reader, filter.as_ref(), count).await?,
                    Scope::Window(window) => self.locate(&reader, filter.as_ref(), window).await?,
                };
                outcome.pushed_filter = filter;
                outcome
            }
        };

        let fetched = outcome.entries.len();
        outcome.entries = predicate.apply(std::mem::take(&mut outcome.entries));
        outcome.execution_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Found {} results ({} fetched, {}, {}ms)",
            outcome.entries.len(),
            fetched,
            outcome.route,
            outcome.execution_time_ms
        );
        Ok(outcome)
    }

    /// The query's search filter, if the source can evaluate it
    fn push_down(&self, query: &Query) -> Option<SearchFilter> {
        let filter = query.search_filter()?;
        if self.source.capabilities().supports(&filter) {
            Some(filter)
        } else {
            tracing::debug!("Source cannot search by {}, filtering locally", filter);
            None
        }
    }

    async fn single(&self, reader: &BoardReader<'_>, index: u64) -> QueryOutcome {
        let mut outcome = QueryOutcome::new(Route::Single);

        match reader.fetch(index, None).await {
            Fetched::Entry(entry) => outcome.entries.push(entry),
            Fetched::Missing => tracing::warn!("{}#{} does not exist", reader.board(), index),
            Fetched::Failed(e) => tracing::warn!("Error fetching index {}: {}", index, e),
        }
        outcome
    }

    async fn direct_fetch(
        &self,
        reader: &BoardReader<'_>,
        filter: Option<&SearchFilter>,
        count: usize,
    ) -> QueryResult<QueryOutcome> {
        let mut outcome = QueryOutcome::new(Route::DirectFetch);
        let newest = reader.newest_index(filter).await?;
        tracing::info!("Newest index: {}", newest);

        if count == 0 || newest == 0 {
            return Ok(outcome);
        }

        let low = newest.saturating_sub(count as u64 - 1).max(1);
        outcome.entries = fetch_range(reader, filter, low, newest).await.entries;
        Ok(outcome)
    }

    async fn locate(
        &self,
        reader: &BoardReader<'_>,
        filter: Option<&SearchFilter>,
        window: TimeOfDayWindow,
    ) -> QueryResult<QueryOutcome> {
        let mut outcome = QueryOutcome::new(Route::Locate);
        let newest = reader.newest_index(filter).await?;
        tracing::info!("Newest index: {}, searching for {}", newest, window);

        let sampling = self
            .sampler
            .sample(&reader.without_retry(), filter, newest, &window)
            .await;
        let bracket = match sampling.span {
            Some(span) => locate(&sampling.samples, &span, self.sampler.config().stride, newest),
            None => IndexBracket::unresolved(),
        };
        outcome.bracket = Some(bracket);

        if !bracket.is_resolved() {
            tracing::warn!(
                "Could not determine index range for {} ({} samples)",
                window,
                sampling.samples.len()
            );
            return Ok(outcome);
        }

        outcome.entries = fetch_range(reader, filter, bracket.low, bracket.high)
            .await
            .entries;
        Ok(outcome)
    }

    /// Walk back one index at a time until an entry older than the range
    async fn calendar_scan(
        &self,
        reader: &BoardReader<'_>,
        range: &DateRange,
    ) -> QueryResult<QueryOutcome> {
        let mut outcome = QueryOutcome::new(Route::CalendarScan);
        let span = range.span();
        let newest = reader.newest_index(None).await?;
        let limit = self.config.calendar_scan_limit.max(1);
        let floor = newest.saturating_sub(limit - 1).max(1);

        tracing::info!("Scanning {} back from {} to at most {}", range, newest, floor);

        let mut passed_start = false;
        for index in (floor..=newest).rev() {
            let entry = match reader.fetch(index, None).await {
                Fetched::Entry(entry) => entry,
                Fetched::Missing => continue,
                Fetched::Failed(e) => {
                    tracing::warn!("Error fetching index {}: {}", index, e);
                    continue;
                }
            };

            match entry.timestamp() {
                Ok(ts) if ts < span.start => {
                    tracing::info!("Index {} predates {}, stopping", index, range.start);
                    passed_start = true;
                    break;
                }
                Ok(ts) if ts <= span.end => outcome.entries.push(entry),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping index {}: {}", index, e),
            }
        }

        if !passed_start && floor > 1 {
            tracing::warn!("Calendar scan hit its limit of {} indices", limit);
        }

        outcome.entries.reverse();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::fixtures::{base, minute_board};
    use crate::model::{Comment, Confidence};
    use crate::query::QueryError;
    use crate::source::{
        Credentials, MemorySource, RetryPolicy, RetryingSource, SourceCapabilities, SourceError,
    };
    use chrono::{Duration, NaiveDate};

    async fn setup(source: MemorySource) -> (Arc<MemorySource>, QueryDispatcher, Session) {
        let source = Arc::new(source);
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();
        let dispatcher = QueryDispatcher::new(source.clone(), DispatcherConfig::default());
        (source, dispatcher, session)
    }

    fn window(start: &str, end: &str) -> Scope {
        Scope::from_bounds(0, Some(start), Some(end)).unwrap()
    }

    fn indices(entries: &[Entry]) -> Vec<u64> {
        entries.iter().map(|e| e.index).collect()
    }

    fn dated(index: u64, y: i32, m: u32, d: u32) -> Entry {
        let ts = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Entry::posted_at(index, format!("post {}", index), "poster", ts)
    }

    #[tokio::test]
    async fn test_latest_count() {
        let (source, dispatcher, session) = setup(
            MemorySource::new()
                .with_board("Test", minute_board(30))
                .with_deleted("Test", &[29]),
        )
        .await;

        let outcome = dispatcher
            .run(&session, &Query::latest("Test", Scope::Count(5)))
            .await
            .unwrap();

        assert_eq!(outcome.route, Route::DirectFetch);
        assert_eq!(indices(&outcome.entries), vec![26, 27, 28, 30]);
        assert_eq!(source.fetch_count(), 5);
    }

    #[tokio::test]
    async fn test_count_larger_than_board() {
        let (_, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", minute_board(3))).await;

        let entries = dispatcher
            .run_query(&session, &Query::latest("Test", Scope::Count(10)))
            .await
            .unwrap();
        assert_eq!(indices(&entries), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_title_search_pushed_down() {
        let mut board = minute_board(20);
        board[4].title = "[問卦] five".into();
        board[14].title = "[問卦] fifteen".into();
        let (source, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", board)).await;

        let outcome = dispatcher
            .run(&session, &Query::title("Test", "問卦", Scope::Count(10)))
            .await
            .unwrap();

        // Fetched by search position, reported by board index
        assert_eq!(outcome.pushed_filter, Some(SearchFilter::Keyword("問卦".into())));
        assert_eq!(indices(&outcome.entries), vec![5, 15]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_title_search_local_without_capability() {
        let mut board = minute_board(20);
        board[4].title = "[問卦] five".into();
        board[14].title = "[問卦] fifteen".into();
        let (source, dispatcher, session) = setup(
            MemorySource::new()
                .with_board("Test", board)
                .with_capabilities(SourceCapabilities::default()),
        )
        .await;

        let outcome = dispatcher
            .run(&session, &Query::title("Test", "問卦", Scope::Count(10)))
            .await
            .unwrap();

        assert_eq!(outcome.pushed_filter, None);
        assert_eq!(indices(&outcome.entries), vec![15]);
        assert_eq!(source.fetch_count(), 10);
    }

    #[tokio::test]
    async fn test_comment_keyword() {
        let mut board = minute_board(10);
        board[7] = board[7].clone().comment(Comment::push("u", "好文推"));
        board[8] = board[8].clone().comment(Comment::neutral("u", "無關"));
        let (_, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", board)).await;

        let entries = dispatcher
            .run_query(&session, &Query::comment("Test", "推", Scope::Count(50)))
            .await
            .unwrap();
        assert_eq!(indices(&entries), vec![8]);
    }

    #[tokio::test]
    async fn test_window_route() {
        let (_, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", minute_board(1000))).await;

        let outcome = dispatcher
            .run(&session, &Query::latest("Test", window("10:00", "12:00")))
            .await
            .unwrap();

        assert_eq!(outcome.route, Route::Locate);
        let bracket = outcome.bracket.unwrap();
        assert_eq!(bracket.confidence, Confidence::Exact);
        assert_eq!(indices(&outcome.entries), (600..=720).collect::<Vec<_>>());
        assert!(outcome
            .entries
            .iter()
            .all(|e| e.timestamp().unwrap() >= base() + Duration::hours(10)));
    }

    #[tokio::test]
    async fn test_unresolved_window_is_empty() {
        let (source, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", minute_board(50))).await;

        let outcome = dispatcher
            .run(&session, &Query::latest("Test", window("00:10", "00:20")))
            .await
            .unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.bracket, Some(IndexBracket::unresolved()));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_calendar_scan_stops_at_older_entry() {
        let board = vec![
            dated(1, 2025, 9, 28),
            dated(2, 2025, 9, 29),
            dated(3, 2025, 9, 30),
            dated(4, 2025, 10, 1),
            dated(5, 2025, 10, 2),
            dated(6, 2025, 10, 3),
            dated(7, 2025, 10, 4),
        ];
        let (source, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", board)).await;
        let range = DateRange::parse("2025-10-01", "2025-10-03").unwrap();

        let outcome = dispatcher.run(&session, &Query::dates("Test", range)).await.unwrap();

        assert_eq!(outcome.route, Route::CalendarScan);
        assert_eq!(indices(&outcome.entries), vec![4, 5, 6]);
        // 7, 6, 5, 4, then 3 (2025-09-30) ends the scan
        assert_eq!(source.fetch_count(), 5);
    }

    #[tokio::test]
    async fn test_calendar_scan_reaches_index_one() {
        let board = vec![dated(1, 2025, 10, 1), dated(2, 2025, 10, 2)];
        let (_, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", board)).await;
        let range = DateRange::parse("2025-10-01", "2025-10-03").unwrap();

        let entries = dispatcher.run_query(&session, &Query::dates("Test", range)).await.unwrap();
        assert_eq!(indices(&entries), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_calendar_scan_limit() {
        let board: Vec<Entry> = (1..=20).map(|i| dated(i, 2025, 10, 2)).collect();
        let source = Arc::new(MemorySource::new().with_board("Test", board));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();
        let dispatcher = QueryDispatcher::new(
            source.clone(),
            DispatcherConfig {
                calendar_scan_limit: 5,
                ..DispatcherConfig::default()
            },
        );
        let range = DateRange::parse("2025-10-01", "2025-10-03").unwrap();

        let entries = dispatcher.run_query(&session, &Query::dates("Test", range)).await.unwrap();
        assert_eq!(indices(&entries), vec![16, 17, 18, 19, 20]);
        assert_eq!(source.fetch_count(), 5);
    }

    #[tokio::test]
    async fn test_single() {
        let (_, dispatcher, session) = setup(
            MemorySource::new()
                .with_board("Test", minute_board(5))
                .with_deleted("Test", &[2]),
        )
        .await;

        let found = dispatcher.run_query(&session, &Query::single("Test", 3)).await.unwrap();
        assert_eq!(indices(&found), vec![3]);

        let missing = dispatcher.run_query(&session, &Query::single("Test", 2)).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_configuration_error_before_fetch() {
        let (source, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", minute_board(5))).await;

        let err = dispatcher
            .run(&session, &Query::title("Test", "  ", Scope::Count(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Configuration(_)));
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_board_propagates() {
        let (_, dispatcher, session) =
            setup(MemorySource::new().with_board("Test", minute_board(5))).await;

        let err = dispatcher
            .run(&session, &Query::latest("Nope", Scope::Count(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Source(SourceError::NoSuchBoard(_))));
    }

    /// Window query through the same retry wiring `connect` builds
    async fn run_window_with_retry(source: MemorySource) -> (Vec<u64>, usize) {
        let source = Arc::new(RetryingSource::new(
            source,
            RetryPolicy {
                max_retries: 2,
                base_delay_ms: 0,
            },
        ));
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();
        let dispatcher = QueryDispatcher::new(source.clone(), DispatcherConfig::default());

        let outcome = dispatcher
            .run(&session, &Query::latest("Test", window("10:00", "12:00")))
            .await
            .unwrap();
        (indices(&outcome.entries), source.inner().fetch_count())
    }

    #[tokio::test]
    async fn test_retry_applies_to_dense_fetch_only() {
        let (clean, clean_fetches) =
            run_window_with_retry(MemorySource::new().with_board("Test", minute_board(1000)))
                .await;
        // 900 is only ever sampled; 650 sits inside the 500..=800 bracket
        let (flaky, flaky_fetches) = run_window_with_retry(
            MemorySource::new()
                .with_board("Test", minute_board(1000))
                .with_failure("Test", 900, 1)
                .with_failure("Test", 650, 1),
        )
        .await;

        assert_eq!(clean, (600..=720).collect::<Vec<_>>());
        assert_eq!(flaky, clean);
        // One extra fetch: the dense retry of 650. The failed sample is skipped.
        assert_eq!(flaky_fetches, clean_fetches + 1);
    }

    #[tokio::test]
    async fn test_window_route_with_pushed_search() {
        // Every tenth post is off-topic, 655 is deleted and 661 has a garbled date
        let mut board = minute_board(1000);
        for entry in board.iter_mut() {
            let tag = if entry.index % 10 == 0 { "[新聞]" } else { "[問卦]" };
            entry.title = format!("{} post {}", tag, entry.index);
        }
        board[660].date = "not a date".into();
        let (_, dispatcher, session) = setup(
            MemorySource::new()
                .with_board("Test", board)
                .with_deleted("Test", &[655]),
        )
        .await;

        let outcome = dispatcher
            .run(&session, &Query::title("Test", "問卦", window("10:00", "12:00")))
            .await
            .unwrap();

        assert_eq!(outcome.route, Route::Locate);
        assert_eq!(outcome.pushed_filter, Some(SearchFilter::Keyword("問卦".into())));

        // 899 search results; samples at positions 599 (board 666, 11:06) and
        // 499 (board 554, 09:14) pin the bracket in search-position space
        let bracket = outcome.bracket.unwrap();
        assert_eq!((bracket.low, bracket.high), (399, 699));
        assert_eq!(bracket.confidence, Confidence::Exact);

        let expected: Vec<u64> = (600..=720)
            .filter(|i| i % 10 != 0 && *i != 655 && *i != 661)
            .collect();
        assert_eq!(indices(&outcome.entries), expected);
    }
}
