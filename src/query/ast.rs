//! Declarative queries
//!
//! A [`Query`] names a board and one of the supported question shapes. Each
//! scoped shape either looks at the newest `count` entries or at a
//! time-of-day window:
//!
//! ```text
//! Latest          newest entries
//! TitleKeyword    title contains a keyword
//! Author          posted by an author
//! CommentKeyword  any comment contains a keyword
//! CommentAuthor   commented on by an author
//! CalendarRange   posted between two calendar dates
//! Single          one entry by index
//! ```

use super::error::{QueryError, QueryResult};
use super::predicate::Predicate;
use crate::model::{TimeOfDayWindow, TimeSpan};
use crate::source::SearchFilter;
use chrono::{Days, Duration, Local, NaiveDate, NaiveTime};

/// A query against one board
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub board: String,
    pub kind: QueryKind,
}

/// The supported question shapes
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Latest { scope: Scope },
    TitleKeyword { keyword: String, scope: Scope },
    Author { author: String, scope: Scope },
    CommentKeyword { keyword: String, scope: Scope },
    CommentAuthor { author: String, scope: Scope },
    CalendarRange(DateRange),
    Single { index: u64 },
}

/// How much of the board a scoped query looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The newest `n` indices
    Count(usize),
    /// Entries posted within a time-of-day window
    Window(TimeOfDayWindow),
}

impl Scope {
    /// Build a scope from optional `HH:MM` bounds
    ///
    /// Both bounds select a window, neither selects `count`, and a lone
    /// bound is rejected.
    pub fn from_bounds(
        count: usize,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> QueryResult<Self> {
        match (start_time, end_time) {
            (Some(start), Some(end)) => {
                let start = parse_time_of_day(start)?;
                let end = parse_time_of_day(end)?;
                TimeOfDayWindow::new(start, end).map(Self::Window).ok_or_else(|| {
                    QueryError::Configuration(format!(
                        "start time {} is after end time {}",
                        start.format("%H:%M"),
                        end.format("%H:%M")
                    ))
                })
            }
            (None, None) => Ok(Self::Count(count)),
            _ => Err(QueryError::Configuration(
                "start_time and end_time must be given together".to_string(),
            )),
        }
    }

    pub fn window(&self) -> Option<TimeOfDayWindow> {
        match self {
            Self::Window(window) => Some(*window),
            Self::Count(_) => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "newest {}", n),
            Self::Window(window) => write!(f, "between {}", window),
        }
    }
}

/// An inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> QueryResult<Self> {
        if start > end {
            return Err(QueryError::Configuration(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds relative to the local calendar day
    pub fn parse(start: &str, end: &str) -> QueryResult<Self> {
        Self::parse_relative_to(start, end, Local::now().date_naive())
    }

    pub fn parse_relative_to(start: &str, end: &str, today: NaiveDate) -> QueryResult<Self> {
        Self::new(parse_date(start, today)?, parse_date(end, today)?)
    }

    /// From the first second of `start` to the last second of `end`
    pub fn span(&self) -> TimeSpan {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = self.end.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1);
        TimeSpan { start, end }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl Query {
    pub fn new(board: impl Into<String>, kind: QueryKind) -> Self {
        Self {
            board: board.into(),
            kind,
        }
    }

    pub fn latest(board: impl Into<String>, scope: Scope) -> Self {
        Self::new(board, QueryKind::Latest { scope })
    }

    pub fn title(board: impl Into<String>, keyword: impl Into<String>, scope: Scope) -> Self {
        Self::new(
            board,
            QueryKind::TitleKeyword {
                keyword: keyword.into(),
                scope,
            },
        )
    }

    pub fn author(board: impl Into<String>, author: impl Into<String>, scope: Scope) -> Self {
        Self::new(
            board,
            QueryKind::Author {
                author: author.into(),
                scope,
            },
        )
    }

    pub fn comment(board: impl Into<String>, keyword: impl Into<String>, scope: Scope) -> Self {
        Self::new(
            board,
            QueryKind::CommentKeyword {
                keyword: keyword.into(),
                scope,
            },
        )
    }

    pub fn commenter(board: impl Into<String>, author: impl Into<String>, scope: Scope) -> Self {
        Self::new(
            board,
            QueryKind::CommentAuthor {
                author: author.into(),
                scope,
            },
        )
    }

    pub fn dates(board: impl Into<String>, range: DateRange) -> Self {
        Self::new(board, QueryKind::CalendarRange(range))
    }

    pub fn single(board: impl Into<String>, index: u64) -> Self {
        Self::new(board, QueryKind::Single { index })
    }

    /// The count or window of scoped queries
    pub fn scope(&self) -> Option<Scope> {
        match &self.kind {
            QueryKind::Latest { scope }
            | QueryKind::TitleKeyword { scope, .. }
            | QueryKind::Author { scope, .. }
            | QueryKind::CommentKeyword { scope, .. }
            | QueryKind::CommentAuthor { scope, .. } => Some(*scope),
            QueryKind::CalendarRange(_) | QueryKind::Single { .. } => None,
        }
    }

    /// The server-side search this query could be narrowed by
    ///
    /// Comment predicates have no server-side counterpart.
    pub fn search_filter(&self) -> Option<SearchFilter> {
        match &self.kind {
            QueryKind::TitleKeyword { keyword, .. } => Some(SearchFilter::Keyword(keyword.clone())),
            QueryKind::Author { author, .. } => Some(SearchFilter::Author(author.clone())),
            _ => None,
        }
    }

    /// The exact predicate the fetched entries must satisfy
    ///
    /// Always includes the keyword or author check, even when the same
    /// filter was pushed to the source.
    pub fn predicate(&self) -> Predicate {
        let mut parts = Vec::new();

        match &self.kind {
            QueryKind::Latest { .. } | QueryKind::Single { .. } => {}
            QueryKind::TitleKeyword { keyword, .. } => {
                parts.push(Predicate::TitleContains(keyword.clone()))
            }
            QueryKind::Author { author, .. } => parts.push(Predicate::AuthorIs(author.clone())),
            QueryKind::CommentKeyword { keyword, .. } => {
                parts.push(Predicate::CommentContentContains(keyword.clone()))
            }
            QueryKind::CommentAuthor { author, .. } => {
                parts.push(Predicate::CommentAuthorIs(author.clone()))
            }
            QueryKind::CalendarRange(range) => {
                parts.push(Predicate::CalendarDateWithin(range.span()))
            }
        }

        if let Some(window) = self.scope().and_then(|scope| scope.window()) {
            parts.push(Predicate::TimeOfDayWithin(window));
        }

        Predicate::all(parts)
    }

    /// Reject queries that cannot be run, before any fetch is issued
    pub fn validate(&self) -> QueryResult<()> {
        if self.board.trim().is_empty() {
            return Err(QueryError::Configuration("board is required".to_string()));
        }

        let (field, value) = match &self.kind {
            QueryKind::TitleKeyword { keyword, .. } | QueryKind::CommentKeyword { keyword, .. } => {
                ("keyword", keyword)
            }
            QueryKind::Author { author, .. } | QueryKind::CommentAuthor { author, .. } => {
                ("author", author)
            }
            QueryKind::Single { index: 0 } => {
                return Err(QueryError::Configuration(
                    "index must be at least 1".to_string(),
                ))
            }
            _ => return Ok(()),
        };

        if value.trim().is_empty() {
            return Err(QueryError::Configuration(format!("{} must not be empty", field)));
        }
        Ok(())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            QueryKind::Latest { scope } => write!(f, "{}: {}", self.board, scope),
            QueryKind::TitleKeyword { keyword, scope } => {
                write!(f, "{}: title contains {:?}, {}", self.board, keyword, scope)
            }
            QueryKind::Author { author, scope } => {
                write!(f, "{}: author {}, {}", self.board, author, scope)
            }
            QueryKind::CommentKeyword { keyword, scope } => {
                write!(f, "{}: comment contains {:?}, {}", self.board, keyword, scope)
            }
            QueryKind::CommentAuthor { author, scope } => {
                write!(f, "{}: commented by {}, {}", self.board, author, scope)
            }
            QueryKind::CalendarRange(range) => write!(f, "{}: {}", self.board, range),
            QueryKind::Single { index } => write!(f, "{}: #{}", self.board, index),
        }
    }
}

/// Parse an `HH:MM` time of day
pub fn parse_time_of_day(s: &str) -> QueryResult<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| QueryError::InvalidTime(s.to_string()))
}

/// Parse a calendar day: `YYYY-MM-DD`, `today`, `yesterday`, `now-Nd` or `now-Nw`
pub fn parse_date(s: &str, today: NaiveDate) -> QueryResult<NaiveDate> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "today" | "now" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    let re = regex::Regex::new(r"^now-(\d+)([dw])$")
        .map_err(|e| QueryError::Configuration(format!("date pattern: {}", e)))?;

    if let Some(caps) = re.captures(s) {
        let amount: u64 = caps[1]
            .parse()
            .map_err(|_| QueryError::InvalidDate(s.to_string()))?;
        let days = match &caps[2] {
            "w" => amount.checked_mul(7),
            _ => Some(amount),
        };

        return days
            .and_then(|days| today.checked_sub_days(Days::new(days)))
            .ok_or_else(|| QueryError::InvalidDate(s.to_string()));
    }

    Err(QueryError::InvalidDate(s.to_string()))
}
