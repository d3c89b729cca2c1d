//! Reconstructed pixel grids
//!
//! Row padding is already stripped: every buffer is tightly packed,
//! `width * height` pixels in row-major order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel encoding of a reconstructed image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelEncoding {
    /// Single channel, 16-bit raw depth units
    Mono16,
    /// 3 channels, 8-bit, B,G,R order
    Bgr8,
    /// 4 channels, 8-bit, B,G,R,A order
    Bgra8,
}

impl PixelEncoding {
    /// Wire pixel stride that selects this encoding
    pub fn pixel_stride(&self) -> u32 {
        match self {
            Self::Mono16 => 2,
            Self::Bgr8 => 3,
            Self::Bgra8 => 4,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            Self::Mono16 => 1,
            Self::Bgr8 => 3,
            Self::Bgra8 => 4,
        }
    }

    /// Transport label used by image message consumers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mono16 => "16UC1",
            Self::Bgr8 => "bgr8",
            Self::Bgra8 => "bgra8",
        }
    }
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned pixel grid, one variant per supported pixel stride
#[derive(Clone, PartialEq, Eq)]
pub enum PixelBuffer {
    /// Depth samples, passed through unscaled
    Depth16 {
        width: u32,
        height: u32,
        samples: Vec<u16>,
    },
    /// Interleaved B,G,R bytes
    Bgr8 {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// Interleaved B,G,R,A bytes
    Bgra8 {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
}

impl PixelBuffer {
    pub fn encoding(&self) -> PixelEncoding {
        match self {
            Self::Depth16 { .. } => PixelEncoding::Mono16,
            Self::Bgr8 { .. } => PixelEncoding::Bgr8,
            Self::Bgra8 { .. } => PixelEncoding::Bgra8,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Self::Depth16 { width, .. } | Self::Bgr8 { width, .. } | Self::Bgra8 { width, .. } => {
                *width
            }
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Depth16 { height, .. }
            | Self::Bgr8 { height, .. }
            | Self::Bgra8 { height, .. } => *height,
        }
    }

    pub fn channels(&self) -> usize {
        self.encoding().channels()
    }

    /// Number of pixels in the grid
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Raw sample bytes (depth samples in native byte order)
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Depth16 { samples, .. } => bytemuck::cast_slice(samples),
            Self::Bgr8 { data, .. } | Self::Bgra8 { data, .. } => data,
        }
    }

    /// Depth sample at (x, y)
    pub fn depth_at(&self, x: u32, y: u32) -> Option<u16> {
        match self {
            Self::Depth16 {
                width,
                height,
                samples,
            } if x < *width && y < *height => samples
                .get(y as usize * *width as usize + x as usize)
                .copied(),
            _ => None,
        }
    }

    /// Channel bytes of the 8-bit pixel at (x, y)
    pub fn color_at(&self, x: u32, y: u32) -> Option<&[u8]> {
        let (width, height, data, channels) = match self {
            Self::Bgr8 {
                width,
                height,
                data,
            } => (*width, *height, data, 3),
            Self::Bgra8 {
                width,
                height,
                data,
            } => (*width, *height, data, 4),
            Self::Depth16 { .. } => return None,
        };
        if x >= width || y >= height {
            return None;
        }
        let start = (y as usize * width as usize + x as usize) * channels;
        data.get(start..start + channels)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("encoding", &self.encoding())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bytes", &self.as_bytes().len())
            .finish()
    }
}
