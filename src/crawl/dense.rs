//! Exhaustive fetch of an index range

use crate::model::Entry;
use crate::source::{BoardReader, Fetched, SearchFilter};

/// Progress is logged every this many indices
const PROGRESS_EVERY: u64 = 50;

/// Entries fetched from a range, plus the indices that yielded nothing
#[derive(Debug, Clone, Default)]
pub struct RangeFetch {
    /// Ascending by index
    pub entries: Vec<Entry>,
    pub missing: Vec<u64>,
    pub failed: Vec<u64>,
}

/// Fetch every index in `[low, high]`, ascending
///
/// Deleted entries are skipped silently and failed fetches are logged and
/// skipped. Index 0 does not exist and is never requested.
pub async fn fetch_range(
    reader: &BoardReader<'_>,
    filter: Option<&SearchFilter>,
    low: u64,
    high: u64,
) -> RangeFetch {
    let mut fetched = RangeFetch::default();
    let low = low.max(1);
    if low > high {
        return fetched;
    }

    let total = high - low + 1;
    tracing::info!("Fetching {} indices {} - {}", reader.board(), low, high);

    for index in low..=high {
        match reader.fetch(index, filter).await {
            Fetched::Entry(entry) => fetched.entries.push(entry),
            Fetched::Missing => fetched.missing.push(index),
            Fetched::Failed(e) => {
                tracing::warn!("Error fetching index {}: {}", index, e);
                fetched.failed.push(index);
            }
        }

        let done = index - low + 1;
        if done % PROGRESS_EVERY == 0 && done < total {
            tracing::info!("Progress: {}/{}", done, total);
        }
    }

    tracing::info!(
        "Fetched {} entries ({} missing, {} failed)",
        fetched.entries.len(),
        fetched.missing.len(),
        fetched.failed.len()
    );
    fetched
}
