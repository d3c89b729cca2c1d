//! ChannelSink - bridges the blocking read loop to async consumers

use async_channel::{bounded, Receiver, Sender};
use contracts::{ContractError, Frame, FrameSink};
use tracing::debug;

/// Sink that forwards frames over a bounded `async-channel`.
///
/// `consume` blocks while the channel is full, so a slow consumer slows the
/// read loop instead of dropping frames. Once every receiver is dropped the
/// sink reports `SinkClosed`.
pub struct ChannelSink {
    name: String,
    tx: Sender<Frame>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, Receiver<Frame>) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }

    /// Wrap an existing sender (several sessions may share one channel)
    pub fn from_sender(name: impl Into<String>, tx: Sender<Frame>) -> Self {
        Self {
            name: name.into(),
            tx,
        }
    }
}

impl FrameSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, frame: Frame) -> Result<(), ContractError> {
        self.tx
            .send_blocking(frame)
            .map_err(|_| ContractError::sink_closed(&self.name))
    }

    fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, pending = self.tx.len(), "ChannelSink closed");
        Ok(())
    }
}
