//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{Modality, SinkConfig, SinkType, StreamerConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{shutdown_signal, Pipeline, PipelineConfig};

/// Name of the file sink added by `--save`
const SAVE_SINK_NAME: &str = "cli_save";

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Parse, then validate once CLI overrides are applied
    let mut streamer = config_loader::ConfigLoader::parse_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut streamer, args, default_output_dir);
    config_loader::validate(&streamer).context("Invalid configuration after CLI overrides")?;

    info!(
        host = %streamer.device.host,
        streams = ?streamer
            .streams
            .enabled_endpoints()
            .iter()
            .map(|e| e.modality.as_str())
            .collect::<Vec<_>>(),
        sinks = streamer.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&streamer);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        streamer,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline... (Ctrl+C to stop)");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    let total = stats.total();
    info!(
        frames = total.frames,
        connect_failures = total.connect_failures,
        transient_disconnects = total.transient_disconnects,
        protocol_errors = total.protocol_errors,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Holostream finished");
    Ok(())
}

/// Apply `--host`, `--sensor`, `--save` and `--output` on top of the file
fn apply_overrides(
    streamer: &mut StreamerConfig,
    args: &RunArgs,
    default_output: impl FnOnce() -> PathBuf,
) {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding device host from CLI");
        streamer.device.host = host.clone();
    }

    if let Some(only) = args.sensor.only() {
        info!(sensor = %only, "Restricting to one stream from CLI");
        for modality in Modality::ALL {
            if modality != only {
                streamer.streams.get_mut(modality).enabled = false;
            }
        }
        streamer.streams.get_mut(only).enabled = true;
    }

    if args.save || args.output.is_some() {
        let base_path = args.output.clone().unwrap_or_else(default_output);
        info!(path = %base_path.display(), "Saving frames");
        streamer.sinks.push(SinkConfig {
            name: SAVE_SINK_NAME.to_string(),
            sink_type: SinkType::File,
            modalities: Vec::new(),
            params: HashMap::from([(
                "base_path".to_string(),
                base_path.display().to_string(),
            )]),
        });
    }
}

/// `./output/<YYYYmmdd_HHMMSS>`
fn default_output_dir() -> PathBuf {
    PathBuf::from("output").join(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(streamer: &StreamerConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Device:");
    println!("  Host: {}", streamer.device.host);
    println!("  Serial: {}", streamer.device.serial);

    println!("\nStreams:");
    for modality in Modality::ALL {
        let stream = streamer.streams.get(modality);
        let state = if stream.enabled { "enabled" } else { "disabled" };
        println!("  - {} (port {}) - {}", modality, stream.port, state);
    }

    if !streamer.sinks.is_empty() {
        println!("\nSinks ({}):", streamer.sinks.len());
        for sink in &streamer.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["holostream", "run"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn fixed_output() -> PathBuf {
        PathBuf::from("output/20260101_000000")
    }

    #[test]
    fn test_host_and_sensor_override() {
        let mut streamer = StreamerConfig::for_host("192.168.50.210");
        let args = run_args(&["--host", "10.1.1.1", "--sensor", "color"]);
        apply_overrides(&mut streamer, &args, fixed_output);

        assert_eq!(streamer.device.host, "10.1.1.1");
        assert!(streamer.streams.color.enabled);
        assert!(!streamer.streams.depth.enabled);
        assert!(streamer.sinks.is_empty());
        // depth disabled: no calibration needed
        assert!(config_loader::validate(&streamer).is_ok());
    }

    #[test]
    fn test_sensor_selection_enables_requested_stream() {
        let mut streamer = StreamerConfig::for_host("h");
        streamer.streams.depth.enabled = false;
        apply_overrides(&mut streamer, &run_args(&["--sensor", "depth"]), fixed_output);
        assert!(streamer.streams.depth.enabled);
        assert!(!streamer.streams.color.enabled);
    }

    #[test]
    fn test_save_uses_default_output() {
        let mut streamer = StreamerConfig::for_host("h");
        apply_overrides(&mut streamer, &run_args(&["--save"]), fixed_output);

        let sink = &streamer.sinks[0];
        assert_eq!(sink.sink_type, SinkType::File);
        assert_eq!(
            PathBuf::from(&sink.params["base_path"]),
            PathBuf::from("output/20260101_000000")
        );
    }

    #[test]
    fn test_output_implies_save() {
        let mut streamer = StreamerConfig::for_host("h");
        apply_overrides(&mut streamer, &run_args(&["-o", "/data/run1"]), fixed_output);
        assert_eq!(streamer.sinks[0].params["base_path"], "/data/run1");
    }

    #[test]
    fn test_default_output_dir_format() {
        let dir = default_output_dir();
        assert!(dir.starts_with("output"));
        let stamp = dir.file_name().unwrap().to_str().unwrap();
        assert_eq!(stamp.len(), "YYYYmmdd_HHMMSS".len());
        assert_eq!(&stamp[8..9], "_");
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let args = run_args(&["--config", path.to_str().unwrap()]);
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_dry_run_validates_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device]\nhost = \"10.0.0.2\"\n").unwrap();

        // depth enabled by default without calibration
        let args = run_args(&["--config", path.to_str().unwrap(), "--dry-run"]);
        assert!(run_pipeline(&args).await.is_err());

        let args = run_args(&[
            "--config",
            path.to_str().unwrap(),
            "--sensor",
            "color",
            "--dry-run",
        ]);
        assert!(run_pipeline(&args).await.is_ok());
    }
}
