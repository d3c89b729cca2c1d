//! Sink construction from configuration

use contracts::{FrameSink, Modality, SinkConfig, SinkType};
use tracing::{debug, instrument};

use crate::error::DispatcherError;
use crate::sinks::{FanoutSink, FileSink, LogSink};

/// Create one sink from its configuration
///
/// `serial` is the device serial used as the frame-id prefix.
pub fn create_sink(
    config: &SinkConfig,
    serial: &str,
) -> Result<Box<dyn FrameSink>, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::from_params(&config.name, &config.params)?.with_serial(serial);
            Ok(Box::new(sink))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)?.with_serial(serial);
            Ok(Box::new(sink))
        }
    }
}

/// Create the fan-out sink for one modality's session
///
/// Each session owns its own sink instances; only configs that apply to
/// `modality`. Without any, the returned fan-out discards frames.
#[instrument(name = "dispatcher_create", skip(configs), fields(count = configs.len()))]
pub fn create_modality_sink(
    modality: Modality,
    configs: &[SinkConfig],
    serial: &str,
) -> Result<FanoutSink, DispatcherError> {
    let mut fanout = FanoutSink::new(format!("{modality}_sinks"));
    for config in configs.iter().filter(|c| c.applies_to(modality)) {
        fanout.push(create_sink(config, serial)?);
        debug!(sink = %config.name, %modality, "sink created");
    }
    Ok(fanout)
}
