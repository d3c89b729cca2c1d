//! Error types for CLI operations.

use contracts::Modality;
use dispatcher::DispatcherError;
use ingestion::IngestionError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Sinks for a stream could not be created
    #[error("Failed to create {modality} sinks")]
    SinkSetup {
        modality: Modality,
        #[source]
        source: DispatcherError,
    },

    /// Session could not be built from the configuration
    #[error("Failed to set up {modality} session")]
    SessionSetup {
        modality: Modality,
        #[source]
        source: IngestionError,
    },

    /// Configuration leaves nothing to stream
    #[error("No streams enabled")]
    NoStreams,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
