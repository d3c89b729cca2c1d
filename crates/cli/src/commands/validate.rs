//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Modality, StreamerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    host: String,
    streams: Vec<String>,
    calibrated: bool,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(streamer) => {
            let warnings = collect_warnings(&streamer);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", streamer.version),
                    host: streamer.device.host.clone(),
                    streams: streamer
                        .streams
                        .enabled_endpoints()
                        .iter()
                        .map(|e| format!("{}:{}", e.modality, e.port))
                        .collect(),
                    calibrated: streamer.calibration.is_some(),
                    sink_count: streamer.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(streamer: &StreamerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if streamer.sinks.is_empty() {
        warnings.push("No sinks configured - frames will be discarded".to_string());
    }

    if streamer.calibration.is_some() && !streamer.streams.get(Modality::Depth).enabled {
        warnings.push("Calibration is ignored while the depth stream is disabled".to_string());
    }

    for sink in &streamer.sinks {
        let disabled = |m: &Modality| !streamer.streams.get(*m).enabled;
        if !sink.modalities.is_empty() && sink.modalities.iter().all(disabled) {
            warnings.push(format!(
                "Sink '{}' only applies to disabled streams",
                sink.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Host: {}", summary.host);
            println!("  Streams: {}", summary.streams.join(", "));
            println!("  Calibrated: {}", summary.calibrated);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
