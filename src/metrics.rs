use std::collections::BTreeMap;

/// Append-only sink for named numeric time series. The aggregator pushes
/// one value per series per round.
pub trait MetricsSink {
    fn append(&mut self, series: &str, value: f64);
}

/// In-memory sink, keyed by series name.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesLog {
    series: BTreeMap<String, Vec<f64>>,
}

impl TimeSeriesLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values appended to `name`, oldest first. Empty if the series
    /// was never written.
    pub fn series(&self, name: &str) -> &[f64] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn last(&self, name: &str) -> Option<f64> {
        self.series(name).last().copied()
    }
}

impl MetricsSink for TimeSeriesLog {
    fn append(&mut self, series: &str, value: f64) {
        self.series.entry(series.to_string()).or_default().push(value);
    }
}

/// What the round aggregator needs from a peer: its cumulative counters,
/// and a way to feed the shared retry timeout back.
pub trait RoundMetrics {
    /// Slots this peer has personally completed via a full quorum.
    fn throughput(&self) -> u64;
    /// Total rounds from proposal to completion, summed over completed
    /// slots.
    fn latency(&self) -> u64;
    fn set_message_wait(&mut self, wait: u64);
}

/// End-of-round aggregation across all peers. Runs strictly between
/// rounds, after every peer's computation for the round has finished.
///
/// Emits the mean latency per completed slot (zero while nothing has
/// completed) and the total throughput, then retunes every peer's retry
/// timeout to the total observed latency plus one round, so retries track
/// round-trip cost. The timeout is left alone until the first completion
/// lands.
pub fn aggregate_round<P: RoundMetrics>(peers: &mut [P], sink: &mut impl MetricsSink) {
    let satisfied: u64 = peers.iter().map(RoundMetrics::throughput).sum();
    let total_latency: u64 = peers.iter().map(RoundMetrics::latency).sum();

    let mean_latency = if satisfied == 0 {
        0.0
    } else {
        total_latency as f64 / satisfied as f64
    };
    sink.append("latency", mean_latency);
    sink.append("throughput", satisfied as f64);

    if total_latency != 0 {
        for peer in peers.iter_mut() {
            peer.set_message_wait(total_latency + 1);
        }
    }
}
