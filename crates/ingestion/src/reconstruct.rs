//! Raw payload -> pixel grid

use contracts::{FrameHeader, ImageLayout, PixelBuffer, StreamError};

use crate::error::Result;

/// Rebuild the pixel grid described by `header` from its raw payload.
///
/// Rows are stepped by `row_stride`; any alignment bytes past
/// `width * pixel_stride` are dropped. Nothing is returned on error.
pub fn reconstruct(header: &FrameHeader, payload: &[u8]) -> Result<PixelBuffer> {
    let layout = header.layout();
    let ImageLayout { width, height, .. } = *layout;

    match layout.pixel_stride {
        2 => {
            let rows = packed_rows(header, payload)?;
            let mut samples = Vec::with_capacity(width as usize * height as usize);
            for row in rows {
                samples.extend(
                    row.chunks_exact(2)
                        .map(|px| u16::from_le_bytes([px[0], px[1]])),
                );
            }
            Ok(PixelBuffer::Depth16 {
                width,
                height,
                samples,
            })
        }
        3 => Ok(PixelBuffer::Bgr8 {
            width,
            height,
            data: packed_rows(header, payload)?.concat(),
        }),
        4 => Ok(PixelBuffer::Bgra8 {
            width,
            height,
            data: packed_rows(header, payload)?.concat(),
        }),
        pixel_stride => Err(StreamError::UnsupportedPixelFormat { pixel_stride }),
    }
}

/// Meaningful bytes of each row, padding removed
fn packed_rows<'a>(header: &FrameHeader, payload: &'a [u8]) -> Result<Vec<&'a [u8]>> {
    let layout = header.layout();
    let packed = layout.packed_row_len();
    let row_stride = u64::from(layout.row_stride);

    if row_stride == 0 || row_stride < packed {
        return Err(StreamError::malformed(
            header.modality(),
            format!("row stride {row_stride} cannot hold {packed} bytes"),
        ));
    }
    if payload.len() as u64 != layout.payload_len() {
        return Err(StreamError::malformed(
            header.modality(),
            format!(
                "payload is {} bytes, header describes {}",
                payload.len(),
                layout.payload_len()
            ),
        ));
    }

    let packed = packed as usize;
    Ok(payload
        .chunks_exact(row_stride as usize)
        .map(|row| &row[..packed])
        .collect())
}
