//! Pipeline orchestration module.

mod metered;
mod orchestrator;
mod stats;

pub use metered::MeteredSink;
pub use orchestrator::{shutdown_signal, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
