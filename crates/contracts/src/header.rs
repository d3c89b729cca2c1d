//! FrameHeader - decoded per-frame metadata
//!
//! One variant per modality. Field order mirrors the wire layout.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::Modality;

/// Seconds between 1601-01-01 (device clock epoch) and 1970-01-01
pub const DEVICE_EPOCH_TO_UNIX_SECS: i64 = 11_644_473_600;

/// Device clock resolution: 100 ns ticks per second
pub const TICKS_PER_SECOND: f64 = 1e7;

/// Image geometry shared by both header variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLayout {
    /// Pixels per row
    pub width: u32,
    /// Rows
    pub height: u32,
    /// Bytes per pixel
    pub pixel_stride: u32,
    /// Bytes per row including alignment padding
    pub row_stride: u32,
}

impl ImageLayout {
    /// Meaningful bytes per row (`width * pixel_stride`)
    pub fn packed_row_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.pixel_stride)
    }

    /// Payload size that follows the header on the wire
    pub fn payload_len(&self) -> u64 {
        u64::from(self.height) * u64::from(self.row_stride)
    }
}

/// Pinhole intrinsics of the color camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    /// Camera matrix K
    pub fn camera_matrix(&self) -> Matrix3<f32> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// 3x4 projection matrix P, row-major, no stereo baseline
    pub fn projection(&self) -> [f32; 12] {
        [
            self.fx, 0.0, self.cx, 0.0, //
            0.0, self.fy, self.cy, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ]
    }
}

/// Color frame header (104 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorHeader {
    /// 100 ns ticks since the device epoch
    pub timestamp: i64,
    pub layout: ImageLayout,
    pub intrinsics: Intrinsics,
    /// Camera-to-world transform exactly as sent (16 floats)
    pub device_to_world: [f32; 16],
}

/// Depth frame header (88 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthHeader {
    /// 100 ns ticks since the device epoch
    pub timestamp: i64,
    pub layout: ImageLayout,
    /// Rig-to-world transform exactly as sent (16 floats)
    pub rig_to_world: [f32; 16],
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum FrameHeader {
    Color(ColorHeader),
    Depth(DepthHeader),
}

impl FrameHeader {
    pub fn modality(&self) -> Modality {
        match self {
            Self::Color(_) => Modality::Color,
            Self::Depth(_) => Modality::Depth,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Color(h) => h.timestamp,
            Self::Depth(h) => h.timestamp,
        }
    }

    pub fn layout(&self) -> &ImageLayout {
        match self {
            Self::Color(h) => &h.layout,
            Self::Depth(h) => &h.layout,
        }
    }

    /// The embedded 4x4 transform, raw wire order
    pub fn raw_transform(&self) -> &[f32; 16] {
        match self {
            Self::Color(h) => &h.device_to_world,
            Self::Depth(h) => &h.rig_to_world,
        }
    }

    /// Color intrinsics, if this is a color header
    pub fn intrinsics(&self) -> Option<&Intrinsics> {
        match self {
            Self::Color(h) => Some(&h.intrinsics),
            Self::Depth(_) => None,
        }
    }

    /// Timestamp converted to seconds since the Unix epoch
    pub fn unix_time_secs(&self) -> f64 {
        self.timestamp() as f64 / TICKS_PER_SECOND - DEVICE_EPOCH_TO_UNIX_SECS as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ImageLayout {
        ImageLayout {
            width: 320,
            height: 288,
            pixel_stride: 2,
            row_stride: 640,
        }
    }

    #[test]
    fn test_payload_len() {
        let l = ImageLayout {
            row_stride: 704,
            ..layout()
        };
        assert_eq!(l.packed_row_len(), 640);
        assert_eq!(l.payload_len(), 288 * 704);
    }

    #[test]
    fn test_unix_time() {
        let header = FrameHeader::Depth(DepthHeader {
            timestamp: DEVICE_EPOCH_TO_UNIX_SECS * 10_000_000 + 5_000_000,
            layout: layout(),
            rig_to_world: [0.0; 16],
        });
        assert!((header.unix_time_secs() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_intrinsics_matrices() {
        let k = Intrinsics {
            fx: 500.0,
            fy: 510.0,
            cx: 320.0,
            cy: 240.0,
        };
        let m = k.camera_matrix();
        assert_eq!(m[(0, 0)], 500.0);
        assert_eq!(m[(1, 2)], 240.0);
        assert_eq!(m[(2, 2)], 1.0);
        assert_eq!(k.projection()[2], 320.0);
        assert_eq!(k.projection()[10], 1.0);
    }
}
