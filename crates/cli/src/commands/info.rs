//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{Modality, StreamerConfig};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    device: DeviceInfo,
    connection: ConnectionInfo,
    streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rig_to_depth: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct DeviceInfo {
    host: String,
    serial: String,
}

#[derive(Serialize)]
struct ConnectionInfo {
    connect_timeout_ms: u64,
    read_timeout_ms: u64,
    reconnect_delay_ms: u64,
    max_payload_bytes: u64,
}

#[derive(Serialize)]
struct StreamInfo {
    modality: Modality,
    port: u16,
    enabled: bool,
    header_bytes: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let streamer = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&streamer, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&streamer, args);
    }

    Ok(())
}

fn build_config_info(streamer: &StreamerConfig, args: &InfoArgs) -> ConfigInfo {
    let streams = Modality::ALL
        .into_iter()
        .map(|modality| {
            let stream = streamer.streams.get(modality);
            StreamInfo {
                modality,
                port: stream.port,
                enabled: stream.enabled,
                header_bytes: modality.header_size(),
            }
        })
        .collect();

    let rig_to_depth = if args.calibration {
        streamer.calibration.as_ref().map(|c| c.rig_to_depth.clone())
    } else {
        None
    };

    let sinks = if args.sinks {
        streamer
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                modalities: s.modalities.clone(),
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let connection = &streamer.connection;
    ConfigInfo {
        version: format!("{:?}", streamer.version),
        device: DeviceInfo {
            host: streamer.device.host.clone(),
            serial: streamer.device.serial.clone(),
        },
        connection: ConnectionInfo {
            connect_timeout_ms: connection.connect_timeout_ms,
            read_timeout_ms: connection.read_timeout_ms,
            reconnect_delay_ms: connection.reconnect_delay_ms,
            max_payload_bytes: connection.max_payload_bytes,
        },
        streams,
        rig_to_depth,
        sinks,
    }
}

fn print_config_info(streamer: &StreamerConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Holostream Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Device info
    println!("🥽 Device");
    println!("   ├─ Version: {:?}", streamer.version);
    println!("   ├─ Host: {}", streamer.device.host);
    println!("   └─ Serial: {}", streamer.device.serial);

    let connection = &streamer.connection;
    println!("\n🔌 Connection");
    println!("   ├─ Connect timeout: {} ms", connection.connect_timeout_ms);
    println!("   ├─ Read timeout: {} ms", connection.read_timeout_ms);
    println!("   ├─ Reconnect delay: {} ms", connection.reconnect_delay_ms);
    println!("   └─ Max payload: {} bytes", connection.max_payload_bytes);

    // Streams
    println!("\n📡 Streams");
    for (i, modality) in Modality::ALL.into_iter().enumerate() {
        let prefix = if i == Modality::ALL.len() - 1 { "└─" } else { "├─" };
        let stream = streamer.streams.get(modality);
        let state = if stream.enabled { "enabled" } else { "disabled" };
        println!(
            "   {} {} on port {} ({}, {} byte header)",
            prefix,
            modality,
            stream.port,
            state,
            modality.header_size()
        );
    }

    // Calibration
    println!("\n📐 Calibration");
    match &streamer.calibration {
        Some(calibration) if args.calibration => {
            println!("   └─ rig_to_depth:");
            for row in calibration.rig_to_depth.chunks(4) {
                let cells: Vec<String> = row.iter().map(|v| format!("{v:>10.6}")).collect();
                println!("        [{}]", cells.join(", "));
            }
        }
        Some(_) => println!("   └─ rig_to_depth: set (use --calibration to show)"),
        None => println!("   └─ rig_to_depth: (none)"),
    }

    // Sinks
    if !streamer.sinks.is_empty() {
        println!("\n📤 Sinks ({})", streamer.sinks.len());
        for (i, sink) in streamer.sinks.iter().enumerate() {
            let is_last = i == streamer.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}) modalities={:?} params={:?}",
                    prefix, sink.name, sink.sink_type, sink.modalities, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
