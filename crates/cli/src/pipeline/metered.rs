//! Sink wrapper feeding the run's metrics aggregator.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ContractError, Frame, FrameSink};
use observability::{record_frame_interval_ms, StreamMetricsAggregator};

/// Records every successfully delivered frame before handing it on
pub struct MeteredSink<S> {
    inner: S,
    aggregator: Arc<Mutex<StreamMetricsAggregator>>,
}

impl<S: FrameSink> MeteredSink<S> {
    pub fn new(inner: S, aggregator: Arc<Mutex<StreamMetricsAggregator>>) -> Self {
        Self { inner, aggregator }
    }
}

impl<S: FrameSink> FrameSink for MeteredSink<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn consume(&mut self, frame: Frame) -> Result<(), ContractError> {
        let modality = frame.modality();
        let stamp = frame.header.unix_time_secs();
        let bytes = frame.pixels.as_bytes().len() as u64;

        let result = self.inner.consume(frame);
        if result.is_ok() {
            let interval = self
                .aggregator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .update(modality, stamp, bytes);
            if let Some(ms) = interval {
                record_frame_interval_ms(modality, ms);
            }
        }
        result
    }

    fn close(&mut self) -> Result<(), ContractError> {
        self.inner.close()
    }
}
