//! Frame - StreamSession output
//!
//! A fully assembled frame: decoded header, reconstructed pixels and pose.
//! Frames are only built once header and payload are complete.

use nalgebra::Matrix4;

use crate::{CameraInfo, FrameHeader, FrameIds, Modality, PixelBuffer, Pose, StampedTransform};

/// One received frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header
    pub header: FrameHeader,

    /// Reconstructed pixel grid
    pub pixels: PixelBuffer,

    /// Camera-to-world in the target world frame
    pub pose: Pose,

    /// Header transform reshaped to 4x4 (device_to_world or rig_to_world),
    /// before any basis conversion
    pub header_transform: Matrix4<f32>,
}

impl Frame {
    pub fn modality(&self) -> Modality {
        self.header.modality()
    }

    /// Device timestamp (100 ns ticks)
    pub fn timestamp(&self) -> i64 {
        self.header.timestamp()
    }

    /// Pose as a stamped transform between the device's world and optical frames
    pub fn stamped_transform(&self, serial: &str) -> StampedTransform {
        let ids = FrameIds::new(serial, self.modality());
        StampedTransform::from_pose(&self.pose, self.header.unix_time_secs(), &ids)
    }

    /// Camera calibration message (color frames only)
    pub fn camera_info(&self, serial: &str) -> Option<CameraInfo> {
        let intrinsics = self.header.intrinsics()?;
        let ids = FrameIds::new(serial, self.modality());
        Some(CameraInfo::new(
            intrinsics,
            self.pixels.width(),
            self.pixels.height(),
            self.header.unix_time_secs(),
            ids.optical,
        ))
    }
}
