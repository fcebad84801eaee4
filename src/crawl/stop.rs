//! Early-stop policies for the sampler

use crate::model::Sample;
use chrono::{Duration, NaiveDateTime};

/// Minimum tolerance before a sample counts as far past the window
pub const DEFAULT_TOLERANCE_FLOOR_MINUTES: i64 = 10;

/// Factor applied to the tolerance
pub const DEFAULT_TOLERANCE_MULTIPLIER: i32 = 2;

/// Decides whether the sampler can stop walking backward
///
/// Called with the two most recent samples (`previous` is the newer one) and
/// the start of the target window.
pub trait StopPolicy: Send + Sync {
    fn should_stop(&self, previous: &Sample, current: &Sample, window_start: NaiveDateTime)
        -> bool;
}

/// Stop once two consecutive samples both sit well before the window
///
/// "Well before" means earlier than `window_start` by more than
/// `max(floor, |Δt between the samples|) × multiplier`, so the margin grows
/// with how fast the board moves per stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToleranceStop {
    pub floor: Duration,
    pub multiplier: i32,
}

impl ToleranceStop {
    pub fn new(floor: Duration, multiplier: i32) -> Self {
        Self { floor, multiplier }
    }

    /// Margin past the window start for this pair of samples
    pub fn tolerance(&self, previous: &Sample, current: &Sample) -> Duration {
        let mut step = previous.timestamp - current.timestamp;
        if step < Duration::zero() {
            step = -step;
        }
        step.max(self.floor) * self.multiplier
    }
}

impl Default for ToleranceStop {
    fn default() -> Self {
        Self {
            floor: Duration::minutes(DEFAULT_TOLERANCE_FLOOR_MINUTES),
            multiplier: DEFAULT_TOLERANCE_MULTIPLIER,
        }
    }
}

impl StopPolicy for ToleranceStop {
    fn should_stop(
        &self,
        previous: &Sample,
        current: &Sample,
        window_start: NaiveDateTime,
    ) -> bool {
        let limit = window_start - self.tolerance(previous, current);
        previous.timestamp < limit && current.timestamp < limit
    }
}

/// Never stop early; only the sample limit and index 1 end the walk
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl StopPolicy for NeverStop {
    fn should_stop(&self, _: &Sample, _: &Sample, _: NaiveDateTime) -> bool {
        false
    }
}
