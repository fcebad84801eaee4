//! boardsift CLI
//!
//! Command-line interface for board queries:
//! - Run a task file
//! - Newest posts, title/author/comment searches, within a count or a
//!   time-of-day window
//! - Posts between two calendar dates
//! - A single post by index

use anyhow::{bail, Context};
use boardsift::config::{generate_default_config, Config};
use boardsift::logging::init_logging;
use boardsift::query::QueryDispatcher;
use boardsift::source::{self, Credentials, Session};
use boardsift::tasks::{
    render_detail, render_table, write_entries, TaskRunner, TaskSpec, TaskType,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "boardsift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find board posts by time window, title, author or comments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/boardsift/config.toml or ./boardsift.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: Format,

    /// Debug logging for boardsift itself
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// How many of the newest posts to look at, or a time-of-day window
#[derive(Args)]
pub struct ScopeArgs {
    /// Number of newest posts to examine
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Window start, HH:MM (requires --end)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, HH:MM (requires --start)
    #[arg(long)]
    pub end: Option<String>,

    /// Also write the results to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every task in a task file (default: the tasks of the config file)
    Run {
        /// TOML or JSON file with `tasks` and optional `options`
        tasks: Option<PathBuf>,
    },

    /// Newest posts
    Latest {
        board: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Posts whose title contains a keyword
    Title {
        board: String,
        keyword: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Posts by an author
    Author {
        board: String,
        author: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Posts with a comment containing a keyword
    Comment {
        board: String,
        keyword: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Posts commented on by an author
    Commenter {
        board: String,
        author: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Posts between two calendar dates (YYYY-MM-DD, today, yesterday, now-3d)
    Dates {
        board: String,
        start: String,
        end: String,
        /// Also write the results to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// One post by index
    Get {
        board: String,
        index: u64,
    },

    /// Print a default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging, cli.verbose)?;

    let source = source::connect(&config.source)?;
    let credentials = Credentials::resolve(&config.credentials.file).with_context(|| {
        format!(
            "no credentials: set BOARDSIFT_ACCOUNT/BOARDSIFT_PASSWORD or create {}",
            config.credentials.file.display()
        )
    })?;
    let session = source.login(&credentials).await?;
    tracing::info!("Logged in as {}", session.account);

    let dispatcher = Arc::new(QueryDispatcher::with_policy(
        Arc::clone(&source),
        config.crawl.dispatcher_config(),
        Arc::new(config.crawl.stop_policy()),
    ));

    let result = execute(&cli, &config, dispatcher, &session).await;

    // Always release the session, even when the command failed
    match source.logout(session).await {
        Ok(()) => tracing::info!("Logged out"),
        Err(e) => tracing::warn!("Logout failed: {}", e),
    }

    result
}

async fn execute(
    cli: &Cli,
    config: &Config,
    dispatcher: Arc<QueryDispatcher>,
    session: &Session,
) -> anyhow::Result<()> {
    let (task, detail) = match &cli.command {
        Commands::Run { tasks } => return run_tasks(cli, config, dispatcher, session, tasks).await,
        Commands::Latest { board, scope } => (scoped(TaskType::GetArticles, board, scope), false),
        Commands::Title {
            board,
            keyword,
            scope,
        } => (
            TaskSpec {
                keyword: Some(keyword.clone()),
                ..scoped(TaskType::SearchTitle, board, scope)
            },
            false,
        ),
        Commands::Author {
            board,
            author,
            scope,
        } => (
            TaskSpec {
                author: Some(author.clone()),
                ..scoped(TaskType::SearchAuthor, board, scope)
            },
            false,
        ),
        Commands::Comment {
            board,
            keyword,
            scope,
        } => (
            TaskSpec {
                keyword: Some(keyword.clone()),
                ..scoped(TaskType::SearchComment, board, scope)
            },
            false,
        ),
        Commands::Commenter {
            board,
            author,
            scope,
        } => (
            TaskSpec {
                author: Some(author.clone()),
                ..scoped(TaskType::SearchCommentsByAuthor, board, scope)
            },
            false,
        ),
        Commands::Dates {
            board,
            start,
            end,
            output,
        } => (
            TaskSpec {
                start_date: Some(start.clone()),
                end_date: Some(end.clone()),
                output: output.clone(),
                ..TaskSpec::new(TaskType::GetArticlesByDate, board.clone())
            },
            false,
        ),
        Commands::Get { board, index } => (
            TaskSpec {
                index: Some(*index),
                ..TaskSpec::new(TaskType::GetArticle, board.clone())
            },
            true,
        ),
        Commands::Config { .. } => return Ok(()),
    };

    let query = task.to_query()?;
    let outcome = dispatcher.run(session, &query).await?;
    tracing::info!(
        "{} results via {} in {}ms",
        outcome.len(),
        outcome.route,
        outcome.execution_time_ms
    );

    if let (Some(path), false) = (&task.output, outcome.is_empty()) {
        write_entries(path, &outcome.entries)
            .with_context(|| format!("cannot write {}", path.display()))?;
        tracing::info!("Saved {} items to {}", outcome.len(), path.display());
    }

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&outcome.entries)?),
        Format::Table if detail => match outcome.entries.first() {
            Some(entry) => print!("{}", render_detail(entry)),
            None => println!("Post not found"),
        },
        Format::Table => print!("{}", render_table(&outcome.entries)),
    }

    Ok(())
}

async fn run_tasks(
    cli: &Cli,
    config: &Config,
    dispatcher: Arc<QueryDispatcher>,
    session: &Session,
    tasks_file: &Option<PathBuf>,
) -> anyhow::Result<()> {
    let (tasks, options) = match tasks_file {
        Some(path) => {
            let file = Config::load(path)?;
            (file.tasks, file.runner.run_options())
        }
        None => (config.tasks.clone(), config.runner.run_options()),
    };

    if tasks.is_empty() {
        bail!("no tasks to run");
    }

    let runner = TaskRunner::new(dispatcher, options);
    let reports = runner.run_all(session, &tasks).await;

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        Format::Table => {
            println!("{:<40} {:>8} {:>8}  {}", "Task", "Results", "ms", "Output");
            println!("{}", "-".repeat(80));
            for report in &reports {
                let status = match (&report.output, &report.error) {
                    (_, Some(error)) => format!("FAILED: {}", error),
                    (Some(path), None) => path.display().to_string(),
                    (None, None) => "-".to_string(),
                };
                println!(
                    "{:<40} {:>8} {:>8}  {}",
                    report.task, report.results, report.duration_ms, status
                );
            }
        }
    }

    if reports.iter().all(|r| !r.succeeded()) {
        bail!("every task failed");
    }
    Ok(())
}

fn scoped(kind: TaskType, board: &str, scope: &ScopeArgs) -> TaskSpec {
    TaskSpec {
        count: scope.count,
        start_time: scope.start.clone(),
        end_time: scope.end.clone(),
        output: scope.output.clone(),
        ..TaskSpec::new(kind, board)
    }
}
