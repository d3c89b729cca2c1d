//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::{Modality, SessionStats};
use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Counters of each finished session
    pub sessions: Vec<(Modality, SessionStats)>,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sinks per session
    pub active_sinks: usize,

    /// Aggregated frame metrics
    pub metrics: MetricsSummary,
}

impl PipelineStats {
    /// Counters summed over all sessions
    pub fn total(&self) -> SessionStats {
        let mut total = SessionStats::default();
        for (_, stats) in &self.sessions {
            total.merge(stats);
        }
        total
    }

    /// Calculate frames per second throughput over all streams
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total().frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let total = self.total();

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Streaming Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames: {}", total.frames);
        println!("   ├─ Bytes: {}", total.bytes);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Sessions: {}", self.sessions.len());
        println!("   └─ Sinks per session: {}", self.active_sinks);

        for (modality, stats) in &self.sessions {
            println!("\n📡 {modality}");
            println!("   ├─ Frames: {}", stats.frames);
            println!("   ├─ Connects: {}", stats.connects);
            println!("   ├─ Connect failures: {}", stats.connect_failures);
            println!("   ├─ Transient disconnects: {}", stats.transient_disconnects);
            println!("   ├─ Protocol errors: {}", stats.protocol_errors);
            println!("   └─ Sink errors: {}", stats.sink_errors);
        }

        println!("\n{}", self.metrics);
    }
}
