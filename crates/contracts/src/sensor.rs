//! Sensor modalities and their stream endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Size of the color frame header on the wire (bytes)
pub const COLOR_HEADER_SIZE: usize = 104;

/// Size of the depth frame header on the wire (bytes)
pub const DEPTH_HEADER_SIZE: usize = 88;

/// Well-known port of the color stream
pub const DEFAULT_COLOR_PORT: u16 = 10090;

/// Well-known port of the depth stream
pub const DEFAULT_DEPTH_PORT: u16 = 10091;

/// Sensor modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Photo/video camera (BGR8 / BGRA8)
    Color,
    /// Depth camera (16-bit samples)
    Depth,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Color, Modality::Depth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Depth => "depth",
        }
    }

    /// Fixed header size for this modality
    pub fn header_size(&self) -> usize {
        match self {
            Self::Color => COLOR_HEADER_SIZE,
            Self::Depth => DEPTH_HEADER_SIZE,
        }
    }

    /// Well-known port the device serves this modality on
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Color => DEFAULT_COLOR_PORT,
            Self::Depth => DEFAULT_DEPTH_PORT,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "color" => Ok(Self::Color),
            "depth" => Ok(Self::Depth),
            other => Err(format!("unknown modality '{other}'")),
        }
    }
}

/// Immutable descriptor of one device stream
///
/// One per modality, built at startup. The header layout is implied by the
/// modality; there is no negotiation on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEndpoint {
    pub modality: Modality,
    pub port: u16,
}

impl SensorEndpoint {
    pub fn new(modality: Modality, port: u16) -> Self {
        Self { modality, port }
    }

    /// Endpoint on the modality's well-known port
    pub fn well_known(modality: Modality) -> Self {
        Self::new(modality, modality.default_port())
    }

    pub fn header_size(&self) -> usize {
        self.modality.header_size()
    }
}
