//! Entry predicates
//!
//! Pure, stateless checks over fetched entries. `apply` keeps the entries
//! that match in their original order, so applying a predicate twice gives
//! the same result as applying it once.

use crate::model::{Entry, TimeOfDayWindow, TimeSpan};

/// A filter over entries
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Title contains the keyword, case-insensitively
    TitleContains(String),
    /// Author id equals the given id, case-insensitively
    AuthorIs(String),
    /// Any comment's content contains the keyword, case-insensitively
    CommentContentContains(String),
    /// Any comment was written by the given author, case-insensitively
    CommentAuthorIs(String),
    /// Time-of-day part of the timestamp falls in the window
    TimeOfDayWithin(TimeOfDayWindow),
    /// Full timestamp falls in the span
    CalendarDateWithin(TimeSpan),
    /// Every inner predicate matches; empty matches everything
    All(Vec<Predicate>),
}

impl Predicate {
    /// Combine predicates, collapsing the single-predicate case
    pub fn all(mut parts: Vec<Predicate>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Self::All(parts)
        }
    }

    /// Matches every entry
    pub fn any() -> Self {
        Self::All(Vec::new())
    }

    /// Check a single entry
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Self::TitleContains(keyword) => {
                entry.title.to_lowercase().contains(&keyword.to_lowercase())
            }
            Self::AuthorIs(author) => {
                entry.author_id().to_lowercase() == author.trim().to_lowercase()
            }
            Self::CommentContentContains(keyword) => {
                let keyword = keyword.to_lowercase();
                entry
                    .comments
                    .iter()
                    .any(|c| c.content.to_lowercase().contains(&keyword))
            }
            Self::CommentAuthorIs(author) => {
                let author = author.trim().to_lowercase();
                entry
                    .comments
                    .iter()
                    .any(|c| c.author.trim().to_lowercase() == author)
            }
            Self::TimeOfDayWithin(window) => match entry.timestamp() {
                Ok(ts) => window.contains(ts),
                Err(e) => {
                    tracing::debug!("Dropping index {}: {}", entry.index, e);
                    false
                }
            },
            Self::CalendarDateWithin(span) => match entry.timestamp() {
                Ok(ts) => span.contains(ts),
                Err(e) => {
                    tracing::debug!("Dropping index {}: {}", entry.index, e);
                    false
                }
            },
            Self::All(parts) => parts.iter().all(|p| p.matches(entry)),
        }
    }

    /// Keep the matching entries, preserving order
    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleContains(keyword) => write!(f, "title ~ {:?}", keyword),
            Self::AuthorIs(author) => write!(f, "author = {}", author),
            Self::CommentContentContains(keyword) => write!(f, "comment ~ {:?}", keyword),
            Self::CommentAuthorIs(author) => write!(f, "commenter = {}", author),
            Self::TimeOfDayWithin(window) => write!(f, "time in {}", window),
            Self::CalendarDateWithin(span) => write!(f, "date in {}", span),
            Self::All(parts) if parts.is_empty() => write!(f, "*"),
            Self::All(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(" AND "))
            }
        }
    }
}
