//! `mock-device` command implementation.

use anyhow::{Context, Result};
use contracts::Modality;
use ingestion::{synthetic_frame, MockDeviceConfig, MockDeviceServer};
use std::time::Duration;
use tracing::info;

use crate::cli::MockDeviceArgs;
use crate::pipeline::shutdown_signal;

/// Execute the `mock-device` command
///
/// Serves synthetic frames on both ports until Ctrl+C. Each accepted
/// connection restarts at frame 0.
pub async fn run_mock_device(args: &MockDeviceArgs) -> Result<()> {
    let servers = spawn_servers(args)?;
    for (modality, server) in &servers {
        info!(
            %modality,
            addr = %server.local_addr(),
            width = args.width,
            height = args.height,
            fps = args.fps,
            "Mock device stream listening"
        );
    }
    info!("Mock device running (Ctrl+C to stop)");

    shutdown_signal().await;

    info!("Stopping mock device...");
    for (modality, mut server) in servers {
        server.stop();
        info!(%modality, connections = server.connections(), "Mock stream stopped");
    }
    Ok(())
}

fn spawn_servers(args: &MockDeviceArgs) -> Result<Vec<(Modality, MockDeviceServer)>> {
    let config = MockDeviceConfig {
        chunk_size: args.chunk_size,
        frame_interval: frame_interval(args.fps),
        max_connections: None,
    };
    let (width, height) = (args.width.max(1), args.height.max(1));

    [
        (Modality::Color, args.color_port),
        (Modality::Depth, args.depth_port),
    ]
    .into_iter()
    .map(|(modality, port)| -> Result<(Modality, MockDeviceServer)> {
        let addr = format!("{}:{}", args.bind, port);
        let server = MockDeviceServer::spawn(addr.as_str(), config.clone(), move |index| {
            Some(synthetic_frame(modality, index, width, height))
        })
        .with_context(|| format!("Failed to bind mock {modality} stream on {addr}"))?;
        Ok((modality, server))
    })
    .collect()
}

/// Pause between frames; `0` fps sends as fast as the socket allows
fn frame_interval(fps: u32) -> Duration {
    if fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(1) / fps
    }
}
