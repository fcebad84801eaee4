//! Boardsift Data Model
//!
//! Request-scoped records flowing through the query pipeline:
//!
//! - **entry**: `Entry` and `Comment`, as returned by a source adapter
//! - **sample**: `Sample`, `TimeSpan`, `TimeOfDayWindow` and `IndexBracket`, used while
//!   locating a time window
//!
//! Entries are immutable once fetched. Samples and brackets only live for
//! the duration of one locate operation.

mod entry;
mod sample;

pub use entry::{Comment, CommentTag, Entry, TimestampError, DATE_FORMAT, DATE_PARSE_FORMAT};
pub use sample::{Confidence, IndexBracket, Sample, TimeOfDayWindow, TimeSpan};
