//! Boardsift Query Engine
//!
//! Answers questions about a board uniformly:
//!
//! - **AST**: declarative [`Query`] shapes and their parameters
//! - **Predicate**: pure entry filters
//! - **Dispatcher**: picks a fetch route, then filters
//!
//! # Example
//!
//! ```rust,ignore
//! use boardsift::query::{Query, QueryDispatcher, Scope};
//!
//! // Newest 10 posts whose title mentions a keyword
//! let query = Query::title("Gossiping", "問卦", Scope::Count(10));
//!
//! // Posts made between 13:00 and 14:00
//! let query = Query::latest("Gossiping", Scope::from_bounds(0, Some("13:00"), Some("14:00"))?);
//!
//! let entries = dispatcher.run_query(&session, &query).await?;
//! ```

mod ast;
mod dispatcher;
mod error;
mod predicate;

pub use ast::{parse_date, parse_time_of_day, DateRange, Query, QueryKind, Scope};
pub use dispatcher::{DispatcherConfig, QueryDispatcher, QueryOutcome, Route};
pub use error::{QueryError, QueryResult};
pub use predicate::Predicate;
