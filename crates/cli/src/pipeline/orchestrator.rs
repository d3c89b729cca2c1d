//! Pipeline orchestrator - one blocking session per enabled stream.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{Modality, SessionStats, StreamerConfig};
use ingestion::{SessionHandle, StreamSession};
use observability::StreamMetricsAggregator;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::{MeteredSink, PipelineStats};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated streamer configuration
    pub streamer: StreamerConfig,

    /// Pipeline timeout (None = run until shutdown)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every enabled session until `shutdown` resolves, the timeout
    /// elapses, or all sessions end on their own.
    ///
    /// Sessions are cancelled through their handles, which closes their
    /// sockets; each session then closes its sinks before returning.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let streamer = &self.config.streamer;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let endpoints = streamer.streams.enabled_endpoints();
        if endpoints.is_empty() {
            return Err(CliError::NoStreams.into());
        }
        if streamer.sinks.is_empty() {
            warn!("No sinks configured - frames will be discarded");
        }

        let aggregator = Arc::new(Mutex::new(StreamMetricsAggregator::new()));
        let mut handles: Vec<SessionHandle> = Vec::new();
        let mut sessions: JoinSet<(Modality, SessionStats)> = JoinSet::new();

        for endpoint in endpoints {
            let modality = endpoint.modality;
            let serial = &streamer.device.serial;
            let sink = dispatcher::create_modality_sink(modality, &streamer.sinks, serial)
                .map_err(|source| CliError::SinkSetup { modality, source })?;
            let sink = MeteredSink::new(sink, aggregator.clone());

            let session = StreamSession::from_config(streamer, modality, sink)
                .map_err(|source| CliError::SessionSetup { modality, source })?;
            handles.push(session.handle());

            info!(
                %modality,
                host = %streamer.device.host,
                port = endpoint.port,
                "Starting session"
            );
            sessions.spawn_blocking(move || (modality, session.run()));
        }

        let active_sinks = streamer.sinks.len();
        let timeout = self.config.timeout;
        let stop = async move {
            match timeout {
                Some(timeout) => tokio::select! {
                    _ = shutdown => {}
                    _ = tokio::time::sleep(timeout) => {
                        info!(timeout_secs = timeout.as_secs(), "Pipeline timeout reached");
                    }
                },
                None => shutdown.await,
            }
        };
        tokio::pin!(stop);

        let mut stats = PipelineStats {
            active_sinks,
            ..Default::default()
        };
        let mut stopping = false;

        loop {
            tokio::select! {
                _ = &mut stop, if !stopping => {
                    stopping = true;
                    info!(sessions = handles.len(), "Stopping sessions...");
                    for handle in &handles {
                        handle.cancel();
                    }
                }
                joined = sessions.join_next() => match joined {
                    Some(Ok((modality, session_stats))) => {
                        info!(%modality, frames = session_stats.frames, "Session finished");
                        stats.sessions.push((modality, session_stats));
                    }
                    Some(Err(e)) => warn!(error = %e, "Session task failed"),
                    None => break,
                },
            }
        }

        stats.sessions.sort_by_key(|(modality, _)| modality.as_str());
        stats.duration = start_time.elapsed();
        stats.metrics = aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
