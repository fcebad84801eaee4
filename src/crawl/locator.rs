//! Bracket inference from sparse samples

use crate::model::{Confidence, IndexBracket, Sample, TimeSpan};

/// Turn samples into a conservative `[low, high]` bracket for `span`
///
/// Samples are scanned in collection order (newest first). The first sample
/// at or before `span.end` puts `high` one stride above it; the first sample
/// at or before `span.start` puts `low` one stride below it and ends the
/// scan. A bound that no sample pins down falls back to the sampled extremes
/// and the bracket is reported as approximate.
///
/// Both bounds are clamped to `[1, newest_index]`. Fewer than two samples
/// cannot bracket anything and yield an unresolved bracket.
pub fn locate(samples: &[Sample], span: &TimeSpan, stride: u64, newest_index: u64) -> IndexBracket {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return IndexBracket::unresolved();
    };
    if samples.len() < 2 {
        return IndexBracket::unresolved();
    }

    let mut high = None;
    let mut low = None;

    for sample in samples {
        if high.is_none() && sample.timestamp <= span.end {
            high = Some(sample.index.saturating_add(stride));
        }
        if sample.timestamp <= span.start {
            low = Some(sample.index.saturating_sub(stride).max(1));
            break;
        }
    }

    let confidence = if high.is_some() && low.is_some() {
        Confidence::Exact
    } else {
        Confidence::Approximate
    };

    let ceiling = newest_index.max(first.index).max(1);
    let high = high.unwrap_or(first.index).clamp(1, ceiling);
    let low = low
        .unwrap_or_else(|| last.index.saturating_sub(stride).max(1))
        .clamp(1, high);

    tracing::info!("Determined index range: {} - {} ({})", low, high, confidence);
    IndexBracket::new(low, high, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn span(start: (u32, u32), end: (u32, u32)) -> TimeSpan {
        TimeSpan::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
    }

    #[test]
    fn test_four_sample_scenario() {
        let samples = vec![
            Sample::new(1000, at(15, 0)),
            Sample::new(900, at(14, 30)),
            Sample::new(800, at(13, 50)),
            Sample::new(700, at(13, 0)),
        ];

        let bracket = locate(&samples, &span((13, 0), (14, 0)), 100, 1000);
        assert_eq!(bracket.high, 900);
        assert_eq!(bracket.low, 600);
        assert_eq!(bracket.confidence, Confidence::Exact);
    }

    #[test]
    fn test_fewer_than_two_samples() {
        let window = span((13, 0), (14, 0));

        assert!(!locate(&[], &window, 100, 50).is_resolved());
        let one = [Sample::new(50, at(13, 30))];
        assert_eq!(locate(&one, &window, 100, 50), IndexBracket::unresolved());
    }

    #[test]
    fn test_default_bounds() {
        // Window is older than every sample: high pinned, low defaulted
        let samples = vec![Sample::new(500, at(20, 0)), Sample::new(400, at(19, 0))];
        let bracket = locate(&samples, &span((8, 0), (9, 0)), 100, 500);
        assert_eq!(bracket.confidence, Confidence::Approximate);
        assert_eq!(bracket.low, 300);
        assert_eq!(bracket.high, 500);

        // Window is newer than every sample: the newest sample pins both ends
        let samples = vec![Sample::new(500, at(8, 0)), Sample::new(400, at(7, 0))];
        let bracket = locate(&samples, &span((21, 0), (22, 0)), 100, 500);
        assert_eq!(bracket.confidence, Confidence::Exact);
        assert_eq!((bracket.low, bracket.high), (400, 500));
    }

    #[test]
    fn test_clamped_to_index_space() {
        let samples = vec![Sample::new(120, at(13, 30)), Sample::new(20, at(12, 0))];
        let bracket = locate(&samples, &span((13, 0), (14, 0)), 100, 120);

        assert_eq!(bracket.high, 120);
        assert_eq!(bracket.low, 1);
        assert_eq!(bracket.confidence, Confidence::Exact);
    }

    #[test]
    fn test_low_never_exceeds_high() {
        let windows = [
            span((0, 0), (0, 30)),
            span((6, 0), (9, 0)),
            span((12, 0), (12, 0)),
            span((23, 0), (23, 59)),
        ];

        for stride in [1, 7, 100, 5000] {
            for count in 2..20u64 {
                // Noisy, mostly decreasing timestamps
                let samples: Vec<Sample> = (0..count)
                    .map(|i| {
                        let minutes = 23 * 60 - i * 70 + (i % 3) * 25;
                        Sample::new(
                            10_000 - i * stride.min(400),
                            at((minutes / 60) as u32 % 24, (minutes % 60) as u32),
                        )
                    })
                    .collect();

                for window in &windows {
                    let bracket = locate(&samples, window, stride, 10_000);
                    assert!(bracket.is_resolved());
                    assert!(bracket.low <= bracket.high, "{} for stride {}", bracket, stride);
                    assert!(bracket.low >= 1 && bracket.high <= 10_000);
                }
            }
        }
    }
}
