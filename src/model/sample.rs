//! Sparse observations and the index brackets derived from them

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// An `(index, timestamp)` point observed while walking a board backward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub index: u64,
    pub timestamp: NaiveDateTime,
}

impl Sample {
    pub fn new(index: u64, timestamp: NaiveDateTime) -> Self {
        Self { index, timestamp }
    }
}

/// An absolute wall-clock window (inclusive on both ends)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSpan {
    /// Create a span, returning None if `start > end`
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Check if a timestamp falls within this span
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// A wall-clock window that repeats every day, e.g. `13:00-14:00`
///
/// Both ends are inclusive. Windows that wrap past midnight are not
/// representable; `new` rejects `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeOfDayWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Check if the time-of-day part of a timestamp falls in the window
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let time = timestamp.time();
        time >= self.start && time <= self.end
    }

    /// Pin the window to a concrete day
    ///
    /// Picks the most recent day whose window start is not after
    /// `reference`, so a reference inside or after today's window selects
    /// today and one before it selects yesterday.
    pub fn anchor(&self, reference: NaiveDateTime) -> TimeSpan {
        let day = if reference.time() >= self.start {
            reference.date()
        } else {
            reference.date() - Duration::days(1)
        };

        TimeSpan {
            start: day.and_time(self.start),
            end: day.and_time(self.end),
        }
    }
}

impl std::fmt::Display for TimeOfDayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// How far a bracket can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Both bounds came from observed samples
    Exact,
    /// At least one bound fell back to a default
    Approximate,
    /// Not enough samples to bracket the window
    Unresolved,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Approximate => write!(f, "approximate"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// A conservative `[low, high]` index interval
///
/// Always a superset of the indices whose timestamps fall in the target
/// window; `confidence` only affects diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexBracket {
    pub low: u64,
    pub high: u64,
    pub confidence: Confidence,
}

impl IndexBracket {
    pub fn new(low: u64, high: u64, confidence: Confidence) -> Self {
        Self {
            low,
            high,
            confidence,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            low: 0,
            high: 0,
            confidence: Confidence::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.confidence != Confidence::Unresolved
    }

    /// Check if an index falls within this bracket
    pub fn contains(&self, index: u64) -> bool {
        self.is_resolved() && index >= self.low && index <= self.high
    }

    /// Number of indices covered
    pub fn len(&self) -> u64 {
        if self.is_resolved() && self.high >= self.low {
            self.high - self.low + 1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for IndexBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_resolved() {
            write!(f, "[{}, {}] ({})", self.low, self.high, self.confidence)
        } else {
            write!(f, "[unresolved]")
        }
    }
}
