//! Temporal Range Locator
//!
//! Finds the index range covering a wall-clock window without scanning the
//! whole board:
//!
//! - **Sampler**: walks backward from the newest index at a fixed stride
//! - **Stop policy**: decides when sampling has gone far enough past the window
//! - **Locator**: turns the samples into a conservative `[low, high]` bracket
//! - **Dense fetcher**: fetches every index of a bracket in ascending order
//!
//! # Pipeline
//!
//! ```text
//! newest index → Sampler → Locator → Dense fetcher → entries
//! ```
//!
//! Stages run strictly one after another against a single session. Per-index
//! failures are logged and skipped inside each stage; nothing here retries.

mod dense;
mod locator;
mod sampler;
mod stop;

pub use dense::{fetch_range, RangeFetch};
pub use locator::locate;
pub use sampler::{Sampler, SamplerConfig, Sampling, WindowTarget};
pub use stop::{
    NeverStop, StopPolicy, ToleranceStop, DEFAULT_TOLERANCE_FLOOR_MINUTES,
    DEFAULT_TOLERANCE_MULTIPLIER,
};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::Entry;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    /// Midnight of the day every fixture board starts on
    pub fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// A board of `n` entries where index `i` was posted `i` minutes after midnight
    pub fn minute_board(n: u64) -> Vec<Entry> {
        (1..=n)
            .map(|i| {
                Entry::posted_at(
                    i,
                    format!("post {}", i),
                    "poster (P)",
                    base() + Duration::minutes(i as i64),
                )
            })
            .collect()
    }
}
