//! Per-sink delivery counters

/// Delivery counters for one member of a fan-out
///
/// Owned by the fan-out and only touched from the session thread.
#[derive(Debug, Default)]
pub struct SinkMetrics {
    delivered: u64,
    failed: u64,
    last_timestamp: Option<i64>,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame accepted by the sink
    pub fn record_delivered(&mut self, timestamp: i64) {
        self.delivered += 1;
        self.last_timestamp = Some(timestamp);
    }

    /// Frame rejected by the sink
    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered,
            failed: self.failed,
            last_timestamp: self.last_timestamp,
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub failed: u64,
    /// Device timestamp of the last delivered frame
    pub last_timestamp: Option<i64>,
}
