//! FanoutSink - delivers each frame to several sinks

use contracts::{ContractError, Frame, FrameSink};
use tracing::{debug, instrument, trace, warn};

use crate::metrics::{MetricsSnapshot, SinkMetrics};

struct Member {
    sink: Box<dyn FrameSink>,
    metrics: SinkMetrics,
}

/// Sink that fans frames out to its members
///
/// A failing member does not stop delivery to the others. A member that
/// reports `SinkClosed` is removed; the fan-out itself is closed once its
/// last member is gone. A fan-out that never had members discards frames.
pub struct FanoutSink {
    name: String,
    members: Vec<Member>,
    had_members: bool,
}

impl FanoutSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            had_members: false,
        }
    }

    /// Add a member sink
    pub fn push(&mut self, sink: Box<dyn FrameSink>) {
        self.members.push(Member {
            sink,
            metrics: SinkMetrics::new(),
        });
        self.had_members = true;
    }

    pub fn with(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Per-member metrics snapshot
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.members
            .iter()
            .map(|m| (m.sink.name().to_string(), m.metrics.snapshot()))
            .collect()
    }
}

impl FrameSink for FanoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "fanout_sink_consume",
        skip(self, frame),
        fields(sink = %self.name, members = self.members.len())
    )]
    fn consume(&mut self, frame: Frame) -> Result<(), ContractError> {
        if self.members.is_empty() {
            if self.had_members {
                return Err(ContractError::sink_closed(&self.name));
            }
            trace!(sink = %self.name, "no members, frame discarded");
            return Ok(());
        }

        let timestamp = frame.timestamp();
        let mut failed = Vec::new();
        let mut closed = Vec::new();
        let last = self.members.len() - 1;
        let mut frame = Some(frame);

        for (i, member) in self.members.iter_mut().enumerate() {
            let item = if i == last {
                frame.take()
            } else {
                frame.clone()
            };
            let Some(item) = item else { break };

            match member.sink.consume(item) {
                Ok(()) => member.metrics.record_delivered(timestamp),
                Err(ContractError::SinkClosed { .. }) => {
                    debug!(member = member.sink.name(), "member sink closed");
                    closed.push(i);
                }
                Err(e) => {
                    member.metrics.record_failed();
                    warn!(member = member.sink.name(), error = %e, "member sink failed");
                    failed.push(member.sink.name().to_string());
                }
            }
        }

        for i in closed.into_iter().rev() {
            let mut member = self.members.remove(i);
            let _ = member.sink.close();
        }
        if self.members.is_empty() {
            return Err(ContractError::sink_closed(&self.name));
        }
        if !failed.is_empty() {
            return Err(ContractError::sink_write(
                &self.name,
                format!("failed members: {}", failed.join(", ")),
            ));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        let mut failed = Vec::new();
        for member in &mut self.members {
            if let Err(e) = member.sink.close() {
                warn!(member = member.sink.name(), error = %e, "member close failed");
                failed.push(member.sink.name().to_string());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ContractError::sink_write(
                &self.name,
                format!("close failed for: {}", failed.join(", ")),
            ))
        }
    }
}
