use identity::HistoryType;
use metric::{DataFeed, FeedRequest, MetricError, Sample};
use std::sync::atomic::{AtomicU64, Ordering};

/// Deterministic stand-in for the fabric management client.
///
/// Each item gets a sawtooth offset by a hash of its name, so charts differ
/// but repeated runs produce the same numbers.
pub struct SimulatedFeed {
    tick: AtomicU64,
    period_secs: u64,
}

impl SimulatedFeed {
    pub fn new(period_secs: u64) -> Self {
        Self {
            tick: AtomicU64::new(0),
            period_secs: period_secs.max(1),
        }
    }

    fn value(item: &str, tick: u64) -> f64 {
        let seed = item
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        ((seed % 100) + (tick % 20) * 5) as f64
    }
}

impl DataFeed for SimulatedFeed {
    fn fetch(&self, request: &FeedRequest) -> Result<Vec<Sample>, MetricError> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let count = match request.history_type {
            None | Some(HistoryType::Current) => 1,
            Some(_) => request.max_points,
        };
        let start = tick.saturating_sub(count as u64 - 1);
        Ok((start..=tick)
            .map(|t| Sample::new((t * self.period_secs) as f64, Self::value(&request.item, t)))
            .collect())
    }
}
