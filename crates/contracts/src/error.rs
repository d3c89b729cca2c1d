//! Layered error definitions
//!
//! Categorized by source: config / stream protocol / sink

use std::net::SocketAddr;

use thiserror::Error;

use crate::Modality;

/// Unified error type for everything outside the read loop
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink can no longer accept frames (consumer went away)
    #[error("sink '{sink_name}' is closed")]
    SinkClosed { sink_name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink closed error
    pub fn sink_closed(sink_name: impl Into<String>) -> Self {
        Self::SinkClosed {
            sink_name: sink_name.into(),
        }
    }
}

/// How a stream error ends the current connection.
///
/// Both kinds trigger the same reconnect; they are reported apart so that a
/// host/device format mismatch is not mistaken for network flakiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectKind {
    /// Network-level trouble: refused, timed out, peer closed
    Transient,
    /// The bytes on the wire do not form a valid frame
    Protocol,
}

impl DisconnectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Protocol => "protocol",
        }
    }
}

/// Errors raised inside a stream session's read loop
#[derive(Debug, Error)]
pub enum StreamError {
    /// TCP connect failed or timed out
    #[error("failed to connect to {modality} endpoint {addr}: {source}")]
    ConnectFailure {
        modality: Modality,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Host address could not be resolved to a socket address
    #[error("cannot resolve {modality} endpoint '{host}:{port}': {message}")]
    Resolve {
        modality: Modality,
        host: String,
        port: u16,
        message: String,
    },

    /// Stream ended (or errored) before the requested byte count arrived
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead {
        expected: usize,
        received: usize,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Header pixel stride is not one of 2, 3, 4
    #[error("unsupported pixel format: pixel stride {pixel_stride}")]
    UnsupportedPixelFormat { pixel_stride: u32 },

    /// Header decoded but carries implausible values
    #[error("malformed {modality} header: {reason}")]
    MalformedHeader { modality: Modality, reason: String },
}

impl StreamError {
    /// Create a malformed header error
    pub fn malformed(modality: Modality, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            modality,
            reason: reason.into(),
        }
    }

    /// Classify the error for reconnect reporting
    pub fn disconnect_kind(&self) -> DisconnectKind {
        match self {
            Self::ConnectFailure { .. } | Self::Resolve { .. } | Self::ShortRead { .. } => {
                DisconnectKind::Transient
            }
            Self::UnsupportedPixelFormat { .. } | Self::MalformedHeader { .. } => {
                DisconnectKind::Protocol
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_kind_tags() {
        let short = StreamError::ShortRead {
            expected: 88,
            received: 10,
            source: None,
        };
        assert_eq!(short.disconnect_kind(), DisconnectKind::Transient);

        let stride = StreamError::UnsupportedPixelFormat { pixel_stride: 5 };
        assert_eq!(stride.disconnect_kind(), DisconnectKind::Protocol);

        let header = StreamError::malformed(Modality::Depth, "zero width");
        assert_eq!(header.disconnect_kind(), DisconnectKind::Protocol);
        assert_eq!(header.to_string(), "malformed depth header: zero width");
    }
}
