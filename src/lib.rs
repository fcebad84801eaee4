//! # boardsift
//!
//! Query engine for message boards whose only access path is a slow,
//! rate-limited "fetch post by index" primitive. Boards keep no index by
//! time, so finding "posts between 13:00 and 14:00" means sampling the board
//! sparsely, bracketing the window by index and then fetching densely
//! inside the bracket.
//!
//! ## Features
//!
//! - **Time-window location**: strided sampling with early stop, then an
//!   index bracket that is a superset of the window
//! - **Predicates**: title/author/comment filters, pushed down to the source
//!   when it can search natively
//! - **Calendar scans**: newest-to-oldest walk that stops past the start date
//! - **Task files**: batch jobs with per-task output files
//! - **Query service**: the same queries over HTTP
//!
//! ## Modules
//!
//! - [`model`]: Entries, comments, samples and index brackets
//! - [`source`]: Source adapters, sessions and retry
//! - [`crawl`]: Sampler, locator and dense fetcher
//! - [`query`]: Query types, predicates and the dispatcher
//! - [`tasks`]: Declarative task runner and result files
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boardsift::query::{Query, QueryDispatcher, DispatcherConfig, Scope};
//! use boardsift::source::{Credentials, EntrySource, MemorySource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(MemorySource::new());
//!     let session = source.login(&Credentials::new("guest", "guest")).await?;
//!
//!     let dispatcher = QueryDispatcher::new(source.clone(), DispatcherConfig::default());
//!     let query = Query::title("Gossiping", "問卦", Scope::from_bounds(10, Some("13:00"), Some("14:00"))?);
//!     let outcome = dispatcher.run(&session, &query).await?;
//!
//!     println!("Found {} posts via {}", outcome.len(), outcome.route);
//!
//!     source.logout(session).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod crawl;
pub mod logging;
pub mod model;
pub mod query;
pub mod source;
pub mod tasks;

// Re-export top-level types for convenience
pub use model::{Comment, CommentTag, Entry, IndexBracket, Sample, TimeOfDayWindow, TimeSpan};

pub use source::{Credentials, EntrySource, SearchFilter, Session, SourceError};

pub use query::{Query, QueryDispatcher, QueryError, QueryOutcome, Route};

pub use tasks::{TaskEntry, TaskRunner, TaskSpec};

pub use config::Config;

pub use api::{build_router, serve, ApiError, AppState};
