//! LogSink - logs frame summary via tracing

use std::collections::HashMap;

use contracts::{ContractError, Frame, FrameSink, StampedTransform, DEFAULT_SERIAL};
use tracing::{info, instrument};

use crate::error::DispatcherError;

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
    /// Frame-id prefix
    serial: String,
    /// Log one frame out of every `every`
    every: u64,
    seen: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial: DEFAULT_SERIAL.to_string(),
            every: 1,
            seen: 0,
        }
    }

    /// Use `serial` as the frame-id prefix
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    /// Create from params map (for factory)
    ///
    /// `every`: log one frame out of N (default 1)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let every = match params.get("every") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| DispatcherError::invalid_param(&name, "every", raw))?,
            None => 1,
        };
        Ok(Self {
            every,
            ..Self::new(name)
        })
    }

    fn transform(&self, frame: &Frame) -> StampedTransform {
        frame.stamped_transform(&self.serial)
    }

    fn log_frame_summary(&self, frame: &Frame) {
        let transform = self.transform(frame);

        info!(
            sink = %self.name,
            modality = %frame.modality(),
            timestamp = frame.timestamp(),
            stamp = transform.stamp_secs,
            parent_frame = %transform.parent_frame,
            child_frame = %transform.child_frame,
            width = frame.pixels.width(),
            height = frame.pixels.height(),
            encoding = %frame.pixels.encoding(),
            translation = ?transform.translation,
            rotation_xyzw = ?transform.rotation,
            "Frame received"
        );
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_consume",
        skip(self, frame),
        fields(sink = %self.name, timestamp = frame.timestamp())
    )]
    fn consume(&mut self, frame: Frame) -> Result<(), ContractError> {
        if self.seen % self.every == 0 {
            self.log_frame_summary(&frame);
        }
        self.seen += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, frames = self.seen, "LogSink closed");
        Ok(())
    }
}
