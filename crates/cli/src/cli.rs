//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{Modality, DEFAULT_COLOR_PORT, DEFAULT_DEPTH_PORT};
use std::path::PathBuf;

/// Holostream - color and depth frame streaming from a mixed-reality headset
#[derive(Parser, Debug)]
#[command(
    name = "holostream",
    author,
    version,
    about = "Mixed-reality color/depth stream client",
    long_about = "Connects to the headset's color and depth TCP streams, reconstructs\n\
                  frames, computes camera-to-world poses, and dispatches them to\n\
                  configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HOLOSTREAM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "HOLOSTREAM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream frames from the device
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Serve synthetic color/depth frames for local testing
    MockDevice(MockDeviceArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "HOLOSTREAM_CONFIG"
    )]
    pub config: PathBuf,

    /// Override device host from configuration
    #[arg(long, env = "HOLOSTREAM_HOST")]
    pub host: Option<String>,

    /// Which streams to run
    #[arg(long, value_enum, default_value = "all")]
    pub sensor: SensorSelection,

    /// Save frames to disk
    #[arg(long)]
    pub save: bool,

    /// Output directory for saved frames (implies --save)
    ///
    /// Defaults to ./output/<YYYYmmdd_HHMMSS>.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "HOLOSTREAM_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "HOLOSTREAM_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the calibration matrix
    #[arg(long)]
    pub calibration: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `mock-device` command
#[derive(Parser, Debug, Clone)]
pub struct MockDeviceArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Color stream port
    #[arg(long, default_value_t = DEFAULT_COLOR_PORT)]
    pub color_port: u16,

    /// Depth stream port
    #[arg(long, default_value_t = DEFAULT_DEPTH_PORT)]
    pub depth_port: u16,

    /// Frame width in pixels
    #[arg(long, default_value = "320")]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "288")]
    pub height: u32,

    /// Frames per second on each stream
    #[arg(long, default_value = "30")]
    pub fps: u32,

    /// Bytes per socket write, to exercise partial reads
    #[arg(long, default_value = "4096")]
    pub chunk_size: usize,
}

/// Stream selection for `run`
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SensorSelection {
    Color,
    Depth,
    /// Whatever the configuration enables
    #[default]
    All,
}

impl SensorSelection {
    /// Modality to keep, or `None` for all configured
    pub fn only(&self) -> Option<Modality> {
        match self {
            Self::Color => Some(Modality::Color),
            Self::Depth => Some(Modality::Depth),
            Self::All => None,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
