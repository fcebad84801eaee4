//! Declarative Task Runner
//!
//! A task file lists jobs such as "newest 10 posts on a board" or "posts
//! commented on by someone between 13:00 and 14:00":
//!
//! ```json
//! {
//!   "tasks": [
//!     {"type": "search_title", "board": "Gossiping", "keyword": "問卦", "output": "out/title.json"},
//!     {"type": "get_articles", "board": "Gossiping", "start_time": "13:00", "end_time": "14:00"}
//!   ],
//!   "options": {"delay_between_requests": 0.5}
//! }
//! ```
//!
//! Each entry is parsed into a [`TaskSpec`] and then a [`Query`] only when it
//! runs; the runner executes them one after another, writes non-empty results
//! to the task's `output`, and keeps going when a task fails, including when
//! its entry is malformed.

mod output;
mod runner;

pub use output::{render_detail, render_entries, render_table, write_entries, OutputError};
pub use runner::{RunOptions, TaskReport, TaskRunner};

use crate::query::{DateRange, Query, QueryError, QueryResult, Scope};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// The job kinds a task file may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    GetArticles,
    SearchTitle,
    SearchAuthor,
    SearchComment,
    SearchCommentsByAuthor,
    GetArticle,
    GetArticlesByDate,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetArticles => "get_articles",
            Self::SearchTitle => "search_title",
            Self::SearchAuthor => "search_author",
            Self::SearchComment => "search_comment",
            Self::SearchCommentsByAuthor => "search_comments_by_author",
            Self::GetArticle => "get_article",
            Self::GetArticlesByDate => "get_articles_by_date",
        }
    }

    /// How many newest entries a count-scoped task looks at by default
    ///
    /// Comment searches scan more since most posts will not match.
    pub fn default_count(&self) -> usize {
        match self {
            Self::SearchComment => 50,
            Self::SearchCommentsByAuthor => 100,
            _ => 10,
        }
    }
}

impl FromStr for TaskType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get_articles" => Ok(Self::GetArticles),
            "search_title" => Ok(Self::SearchTitle),
            "search_author" => Ok(Self::SearchAuthor),
            "search_comment" => Ok(Self::SearchComment),
            "search_comments_by_author" => Ok(Self::SearchCommentsByAuthor),
            "get_article" => Ok(Self::GetArticle),
            "get_articles_by_date" => Ok(Self::GetArticlesByDate),
            other => Err(QueryError::Configuration(format!(
                "unknown task type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a task file
///
/// The type is kept as text so that an unknown type fails only its own task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Where to write the results as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl TaskSpec {
    pub fn new(kind: TaskType, board: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            board: Some(board.into()),
            ..Self::default()
        }
    }

    pub fn task_type(&self) -> QueryResult<TaskType> {
        self.kind.parse()
    }

    /// Label used in logs and reports
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => match &self.board {
                Some(board) => format!("{} ({})", self.kind, board),
                None => self.kind.clone(),
            },
        }
    }

    /// Convert into a query, failing on missing or malformed fields
    pub fn to_query(&self) -> QueryResult<Query> {
        let kind = self.task_type()?;
        let board = required("board", &self.board)?;
        let scope = || {
            Scope::from_bounds(
                self.count.unwrap_or_else(|| kind.default_count()),
                self.start_time.as_deref(),
                self.end_time.as_deref(),
            )
        };

        let query = match kind {
            TaskType::GetArticles => Query::latest(board, scope()?),
            TaskType::SearchTitle => {
                Query::title(board, required("keyword", &self.keyword)?, scope()?)
            }
            TaskType::SearchAuthor => {
                Query::author(board, required("author", &self.author)?, scope()?)
            }
            TaskType::SearchComment => {
                Query::comment(board, required("keyword", &self.keyword)?, scope()?)
            }
            TaskType::SearchCommentsByAuthor => {
                Query::commenter(board, required("author", &self.author)?, scope()?)
            }
            TaskType::GetArticle => {
                let index = self.index.ok_or_else(|| missing("index"))?;
                Query::single(board, index)
            }
            TaskType::GetArticlesByDate => {
                let range = DateRange::parse(
                    required("start_date", &self.start_date)?,
                    required("end_date", &self.end_date)?,
                )?;
                Query::dates(board, range)
            }
        };

        query.validate()?;
        Ok(query)
    }
}

/// A task file entry as written
///
/// Entries are parsed into a [`TaskSpec`] only when they run, so a malformed
/// field fails that task alone instead of the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskEntry(serde_json::Value);

impl TaskEntry {
    pub fn spec(&self) -> QueryResult<TaskSpec> {
        TaskSpec::deserialize(&self.0)
            .map_err(|e| QueryError::Configuration(format!("malformed task: {}", e)))
    }

    /// Label used in logs and reports, available even when the entry is malformed
    pub fn label(&self) -> String {
        let field = |name: &str| self.0.get(name).and_then(|v| v.as_str());
        match (field("name"), field("type"), field("board")) {
            (Some(name), _, _) => name.to_string(),
            (None, Some(kind), Some(board)) => format!("{} ({})", kind, board),
            (None, Some(kind), None) => kind.to_string(),
            (None, None, _) => "untyped task".to_string(),
        }
    }
}

impl From<TaskSpec> for TaskEntry {
    fn from(spec: TaskSpec) -> Self {
        Self(serde_json::to_value(spec).unwrap_or(serde_json::Value::Null))
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> QueryResult<&'a str> {
    value.as_deref().ok_or_else(|| missing(field))
}

fn missing(field: &str) -> QueryError {
    QueryError::Configuration(format!("missing required field: {}", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryKind;

    fn parse(json: &str) -> TaskSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_counts() {
        let task = parse(r#"{"type": "search_comment", "board": "Test", "keyword": "推"}"#);
        let query = task.to_query().unwrap();
        assert_eq!(query.scope(), Some(Scope::Count(50)));

        let task = parse(r#"{"type": "search_comments_by_author", "board": "Test", "author": "bob"}"#);
        assert_eq!(task.to_query().unwrap().scope(), Some(Scope::Count(100)));

        let task = parse(r#"{"type": "get_articles", "board": "Test", "count": 3}"#);
        assert_eq!(task.to_query().unwrap().scope(), Some(Scope::Count(3)));
    }

    #[test]
    fn test_time_window_task() {
        let task = parse(
            r#"{"type": "search_title", "board": "Test", "keyword": "問卦",
                "start_time": "13:00", "end_time": "14:00"}"#,
        );
        let query = task.to_query().unwrap();

        assert!(matches!(query.kind, QueryKind::TitleKeyword { .. }));
        assert!(query.scope().unwrap().window().is_some());
    }

    #[test]
    fn test_date_and_single_tasks() {
        let task = parse(
            r#"{"type": "get_articles_by_date", "board": "Test",
                "start_date": "2025-10-01", "end_date": "2025-10-03"}"#,
        );
        assert!(matches!(task.to_query().unwrap().kind, QueryKind::CalendarRange(_)));

        let task = parse(r#"{"type": "get_article", "board": "Test", "index": 42}"#);
        assert_eq!(task.to_query().unwrap().kind, QueryKind::Single { index: 42 });
    }

    #[test]
    fn test_configuration_errors() {
        let cases = [
            r#"{"type": "search_title", "board": "Test"}"#,
            r#"{"type": "get_articles"}"#,
            r#"{"type": "get_article", "board": "Test"}"#,
            r#"{"type": "get_articles", "board": "Test", "start_time": "13:00"}"#,
            r#"{"type": "get_articles_by_date", "board": "Test", "start_date": "2025-13-01", "end_date": "2025-10-03"}"#,
            r#"{"type": "delete_everything", "board": "Test"}"#,
        ];

        for case in cases {
            let err = parse(case).to_query().unwrap_err();
            assert!(err.is_configuration(), "{}: {}", case, err);
        }
    }

    #[test]
    fn test_entry_malformed_field() {
        let entry: TaskEntry =
            serde_json::from_str(r#"{"type": "get_article", "board": "Test", "index": "42"}"#)
                .unwrap();

        let err = entry.spec().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(entry.label(), "get_article (Test)");

        let good: TaskEntry =
            serde_json::from_str(r#"{"type": "get_article", "board": "Test", "index": 42}"#).unwrap();
        assert_eq!(good.spec().unwrap().index, Some(42));
    }

    #[test]
    fn test_entry_from_spec() {
        let spec = TaskSpec {
            count: Some(3),
            ..TaskSpec::new(TaskType::GetArticles, "Test")
        };
        let entry = TaskEntry::from(spec.clone());

        assert_eq!(entry.spec().unwrap(), spec);
        assert_eq!(entry.label(), spec.label());
    }

    #[test]
    fn test_label() {
        let task = TaskSpec::new(TaskType::GetArticles, "Test");
        assert_eq!(task.label(), "get_articles (Test)");

        let named = TaskSpec {
            name: Some("morning".into()),
            ..task
        };
        assert_eq!(named.label(), "morning");
    }
}
