//! Fixed-layout frame header codec
//!
//! Little-endian, packed, no padding:
//!
//! ```text
//! color (104): i64 ts | u32 w h pixel_stride row_stride | f32 fx fy cx cy | f32[16]
//! depth  (88): i64 ts | u32 w h pixel_stride row_stride | f32[16]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{
    ColorHeader, DepthHeader, FrameHeader, ImageLayout, Intrinsics, Modality, StreamError,
};

use crate::error::Result;

/// Decode one header of `modality` from exactly `modality.header_size()` bytes
///
/// Only the buffer size is checked here; see [`HeaderCodec::payload_len`] for
/// the plausibility checks on the decoded values.
pub fn decode(modality: Modality, bytes: &[u8]) -> Result<FrameHeader> {
    let expected = modality.header_size();
    if bytes.len() != expected {
        return Err(StreamError::malformed(
            modality,
            format!("header is {} bytes, expected {expected}", bytes.len()),
        ));
    }

    let mut buf = bytes;
    let timestamp = buf.get_i64_le();
    let layout = ImageLayout {
        width: buf.get_u32_le(),
        height: buf.get_u32_le(),
        pixel_stride: buf.get_u32_le(),
        row_stride: buf.get_u32_le(),
    };

    let header = match modality {
        Modality::Color => {
            let intrinsics = Intrinsics {
                fx: buf.get_f32_le(),
                fy: buf.get_f32_le(),
                cx: buf.get_f32_le(),
                cy: buf.get_f32_le(),
            };
            FrameHeader::Color(ColorHeader {
                timestamp,
                layout,
                intrinsics,
                device_to_world: get_matrix(&mut buf),
            })
        }
        Modality::Depth => FrameHeader::Depth(DepthHeader {
            timestamp,
            layout,
            rig_to_world: get_matrix(&mut buf),
        }),
    };

    debug_assert!(!buf.has_remaining());
    Ok(header)
}

/// Encode a header into its wire form
pub fn encode(header: &FrameHeader) -> Bytes {
    let mut buf = BytesMut::with_capacity(header.modality().header_size());
    buf.put_i64_le(header.timestamp());

    let layout = header.layout();
    buf.put_u32_le(layout.width);
    buf.put_u32_le(layout.height);
    buf.put_u32_le(layout.pixel_stride);
    buf.put_u32_le(layout.row_stride);

    if let Some(k) = header.intrinsics() {
        buf.put_f32_le(k.fx);
        buf.put_f32_le(k.fy);
        buf.put_f32_le(k.cx);
        buf.put_f32_le(k.cy);
    }
    for v in header.raw_transform() {
        buf.put_f32_le(*v);
    }

    buf.freeze()
}

fn get_matrix(buf: &mut &[u8]) -> [f32; 16] {
    std::array::from_fn(|_| buf.get_f32_le())
}

/// Header codec bound to one session's modality
#[derive(Debug, Clone, Copy)]
pub struct HeaderCodec {
    modality: Modality,
    max_payload_bytes: u64,
}

impl HeaderCodec {
    pub fn new(modality: Modality, max_payload_bytes: u64) -> Self {
        Self {
            modality,
            max_payload_bytes,
        }
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn header_size(&self) -> usize {
        self.modality.header_size()
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<FrameHeader> {
        decode(self.modality, bytes)
    }

    /// Validate the decoded geometry and return the payload size to read next
    ///
    /// # Errors
    /// `StreamError::MalformedHeader` for zero dimensions, a zero pixel
    /// stride, rows shorter than their pixels, or a payload above the limit.
    pub fn payload_len(&self, header: &FrameHeader) -> Result<usize> {
        let layout = header.layout();
        let malformed = |reason: String| Err(StreamError::malformed(self.modality, reason));

        if layout.width == 0 || layout.height == 0 {
            return malformed(format!(
                "empty image {}x{}",
                layout.width, layout.height
            ));
        }
        if layout.pixel_stride == 0 {
            return malformed("pixel stride is zero".to_string());
        }
        if u64::from(layout.row_stride) < layout.packed_row_len() {
            return malformed(format!(
                "row stride {} shorter than {} pixels of {} bytes",
                layout.row_stride, layout.width, layout.pixel_stride
            ));
        }

        let len = layout.payload_len();
        if len > self.max_payload_bytes {
            return malformed(format!(
                "payload of {len} bytes exceeds limit of {}",
                self.max_payload_bytes
            ));
        }
        match usize::try_from(len) {
            Ok(len) => Ok(len),
            Err(_) => malformed(format!("payload of {len} bytes does not fit in memory")),
        }
    }
}
