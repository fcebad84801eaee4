//! Backward sparse sampling
//!
//! Observes `(index, timestamp)` points at a fixed stride, starting from the
//! newest index and moving toward index 1. Deleted entries and entries with
//! unparseable timestamps yield no sample; failed fetches are logged and
//! skipped. Nothing is retried.

use super::stop::StopPolicy;
use crate::model::{Sample, TimeOfDayWindow, TimeSpan};
use crate::source::{BoardReader, Fetched, SearchFilter};
use std::sync::Arc;

/// Sampler tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Indices skipped between two samples
    pub stride: u64,
    /// Hard ceiling on samples collected
    pub max_samples: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            stride: 100,
            max_samples: 1000,
        }
    }
}

/// A window the sampler is looking for
///
/// Resolved to an absolute span once the newest timestamp is known.
pub trait WindowTarget: Send + Sync {
    fn resolve(&self, newest_observed: chrono::NaiveDateTime) -> TimeSpan;
}

impl WindowTarget for TimeSpan {
    fn resolve(&self, _: chrono::NaiveDateTime) -> TimeSpan {
        *self
    }
}

impl WindowTarget for TimeOfDayWindow {
    fn resolve(&self, newest_observed: chrono::NaiveDateTime) -> TimeSpan {
        self.anchor(newest_observed)
    }
}

/// Result of one sampling walk
#[derive(Debug, Clone, Default)]
pub struct Sampling {
    /// Samples in collection order (decreasing index)
    pub samples: Vec<Sample>,
    /// The target window as resolved against the first sample
    pub span: Option<TimeSpan>,
}

/// Walks a board backward at a fixed stride
pub struct Sampler {
    config: SamplerConfig,
    policy: Arc<dyn StopPolicy>,
}

impl Sampler {
    pub fn new(config: SamplerConfig, policy: Arc<dyn StopPolicy>) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample from `newest_index` down toward 1
    pub async fn sample(
        &self,
        reader: &BoardReader<'_>,
        filter: Option<&SearchFilter>,
        newest_index: u64,
        target: &dyn WindowTarget,
    ) -> Sampling {
        let stride = self.config.stride.max(1);
        let mut sampling = Sampling::default();
        let mut index = newest_index;

        tracing::info!(
            "Sampling {} from index {} (stride {})",
            reader.board(),
            newest_index,
            stride
        );

        while index >= 1 {
            match reader.fetch(index, filter).await {
                Fetched::Entry(entry) => match entry.timestamp() {
                    Ok(timestamp) => {
                        let span = *sampling
                            .span
                            .get_or_insert_with(|| target.resolve(timestamp));
                        sampling.samples.push(Sample::new(index, timestamp));
                        tracing::debug!("Sample: index={}, time={}", index, timestamp);

                        if self.should_stop(&sampling.samples, span) {
                            tracing::info!("Sampled past {}, stopping", span.start);
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("Skipping sample at {}: {}", index, e),
                },
                Fetched::Missing => tracing::debug!("Index {} is deleted", index),
                Fetched::Failed(e) => tracing::warn!("Error fetching index {}: {}", index, e),
            }

            if sampling.samples.len() >= self.config.max_samples {
                tracing::info!("Reached sampling limit ({})", self.config.max_samples);
                break;
            }

            index = match index.checked_sub(stride) {
                Some(next) => next,
                None => break,
            };
        }

        tracing::info!("Collected {} samples", sampling.samples.len());
        sampling
    }

    fn should_stop(&self, samples: &[Sample], span: TimeSpan) -> bool {
        match samples {
            [.., previous, current] => self.policy.should_stop(previous, current, span.start),
            _ => false,
        }
    }
}
