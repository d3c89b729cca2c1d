//! Session runtime state and counters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DisconnectKind;

/// Stream session lifecycle
///
/// `Disconnected -> Connecting -> Connected -> Streaming -> Disconnected`.
/// Frames are only produced in `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Streaming,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Streaming => "streaming",
        };
        f.write_str(s)
    }
}

/// Counters accumulated over a session's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Frames delivered to the sink
    pub frames: u64,
    /// Header + payload bytes read
    pub bytes: u64,
    /// Successful connects
    pub connects: u64,
    /// Failed connect attempts
    pub connect_failures: u64,
    /// Connections lost to network trouble
    pub transient_disconnects: u64,
    /// Connections dropped because of corrupt or incompatible frames
    pub protocol_errors: u64,
    /// Sink failures that did not stop the stream
    pub sink_errors: u64,
}

impl SessionStats {
    /// Record a connection that ended with an error
    pub fn record_disconnect(&mut self, kind: DisconnectKind) {
        match kind {
            DisconnectKind::Transient => self.transient_disconnects += 1,
            DisconnectKind::Protocol => self.protocol_errors += 1,
        }
    }

    /// Fold another session's counters into this one
    pub fn merge(&mut self, other: &SessionStats) {
        self.frames += other.frames;
        self.bytes += other.bytes;
        self.connects += other.connects;
        self.connect_failures += other.connect_failures;
        self.transient_disconnects += other.transient_disconnects;
        self.protocol_errors += other.protocol_errors;
        self.sink_errors += other.sink_errors;
    }
}
