//! Sequential task execution

use super::output::write_entries;
use super::{TaskEntry, TaskSpec};
use crate::query::QueryDispatcher;
use crate::source::Session;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pacing between tasks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub delay: Duration,
}

impl RunOptions {
    /// Options with a delay in (fractional) seconds; negative values mean none
    pub fn from_secs(delay_between_requests: f64) -> Self {
        Self {
            delay: Duration::try_from_secs_f64(delay_between_requests).unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_secs(0.5)
    }
}

/// What happened to one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub results: usize,
    /// Set when results were written
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs tasks one after another against a single session
pub struct TaskRunner {
    dispatcher: Arc<QueryDispatcher>,
    options: RunOptions,
}

impl TaskRunner {
    pub fn new(dispatcher: Arc<QueryDispatcher>, options: RunOptions) -> Self {
        Self {
            dispatcher,
            options,
        }
    }

    /// Run every task, sleeping between them
    ///
    /// A failed task is logged and reported; the remaining tasks still run.
    pub async fn run_all(&self, session: &Session, tasks: &[TaskEntry]) -> Vec<TaskReport> {
        let mut reports = Vec::with_capacity(tasks.len());

        for (i, task) in tasks.iter().enumerate() {
            if i > 0 && !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }
            reports.push(self.run_entry(session, task).await);
        }

        let failed = reports.iter().filter(|r| !r.succeeded()).count();
        tracing::info!(
            "All tasks completed ({} tasks, {} failed)",
            reports.len(),
            failed
        );
        reports
    }

    /// Parse and run one task file entry
    pub async fn run_entry(&self, session: &Session, entry: &TaskEntry) -> TaskReport {
        match entry.spec() {
            Ok(task) => self.run_task(session, &task).await,
            Err(e) => {
                let label = entry.label();
                tracing::error!("Task {} failed: {}", label, e);
                TaskReport {
                    task: label,
                    results: 0,
                    output: None,
                    error: Some(e.to_string()),
                    duration_ms: 0,
                }
            }
        }
    }

    /// Run one task and write its results
    pub async fn run_task(&self, session: &Session, task: &TaskSpec) -> TaskReport {
        let start = Instant::now();
        let label = task.label();
        let mut report = TaskReport {
            task: label.clone(),
            results: 0,
            output: None,
            error: None,
            duration_ms: 0,
        };

        tracing::info!("Task {}", label);

        let outcome = match task.to_query() {
            Ok(query) => self.dispatcher.run(session, &query).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                report.results = outcome.len();
                tracing::info!("Task {}: found {} results", label, outcome.len());

                if let (Some(path), false) = (&task.output, outcome.is_empty()) {
                    match write_entries(path, &outcome.entries) {
                        Ok(()) => {
                            tracing::info!("Saved {} items to {}", outcome.len(), path.display());
                            report.output = Some(path.clone());
                        }
                        Err(e) => {
                            tracing::error!("Task {}: could not write {}: {}", label, path.display(), e);
                            report.error = Some(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("Task {} failed: {}", label, e);
                report.error = Some(e.to_string());
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::fixtures::minute_board;
    use crate::model::Entry;
    use crate::query::DispatcherConfig;
    use crate::source::{Credentials, EntrySource, MemorySource};
    use crate::tasks::TaskType;
    use tempfile::TempDir;

    async fn runner(source: MemorySource) -> (TaskRunner, Session) {
        let session = source.login(&Credentials::new("u", "p")).await.unwrap();
        let dispatcher = QueryDispatcher::new(Arc::new(source), DispatcherConfig::default());
        let options = RunOptions {
            delay: Duration::from_millis(1),
        };
        (TaskRunner::new(Arc::new(dispatcher), options), session)
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let (runner, session) = runner(MemorySource::new().with_board("Test", minute_board(20))).await;

        let broken = TaskSpec::new(TaskType::SearchTitle, "Test");
        let unknown_board = TaskSpec::new(TaskType::GetArticles, "Nope");
        let good = TaskSpec {
            count: Some(3),
            output: Some(dir.path().join("out/latest.json")),
            ..TaskSpec::new(TaskType::GetArticles, "Test")
        };

        let tasks: Vec<TaskEntry> = vec![broken.into(), unknown_board.into(), good.into()];
        let reports = runner.run_all(&session, &tasks).await;

        assert_eq!(reports.len(), 3);
        assert!(!reports[0].succeeded());
        assert!(!reports[1].succeeded());
        assert!(reports[2].succeeded());
        assert_eq!(reports[2].results, 3);

        let written: Vec<Entry> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("out/latest.json")).unwrap(),
        )
        .unwrap();
        let indices: Vec<u64> = written.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![18, 19, 20]);
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_stop_batch() {
        let (runner, session) = runner(MemorySource::new().with_board("Test", minute_board(20))).await;

        let tasks: Vec<TaskEntry> = serde_json::from_str(
            r#"[
                {"type": "get_article", "board": "Test", "index": "42"},
                {"type": "get_articles", "board": "Test", "count": 3}
            ]"#,
        )
        .unwrap();
        let reports = runner.run_all(&session, &tasks).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].task, "get_article (Test)");
        assert!(reports[0].error.as_deref().unwrap().contains("malformed task"));
        assert!(reports[1].succeeded());
        assert_eq!(reports[1].results, 3);
    }

    #[tokio::test]
    async fn test_empty_results_are_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("none.json");
        let (runner, session) = runner(MemorySource::new().with_board("Test", minute_board(5))).await;

        let task = TaskSpec {
            keyword: Some("no such title".into()),
            output: Some(path.clone()),
            ..TaskSpec::new(TaskType::SearchTitle, "Test")
        };
        let report = runner.run_task(&session, &task).await;

        assert!(report.succeeded());
        assert_eq!(report.results, 0);
        assert!(report.output.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_run_options_from_secs() {
        assert_eq!(RunOptions::from_secs(0.5).delay, Duration::from_millis(500));
        assert_eq!(RunOptions::from_secs(-1.0).delay, Duration::ZERO);
    }
}
