//! Pose and the transport forms derived from it.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Intrinsics, Modality};

/// Camera-to-world rigid transform at one timestamp
///
/// The matrix is kept exactly as composed; rotation is not re-orthonormalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub camera_to_world: Matrix4<f32>,
}

impl Pose {
    pub fn new(camera_to_world: Matrix4<f32>) -> Self {
        Self { camera_to_world }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    /// Last column, first three rows
    pub fn translation(&self) -> Vector3<f32> {
        self.camera_to_world.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Top-left 3x3 block
    pub fn rotation(&self) -> Matrix3<f32> {
        self.camera_to_world.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Rotation as a unit quaternion, for transform broadcast
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation()))
    }

    /// Row-major copy of the matrix
    pub fn to_row_major(&self) -> [[f32; 4]; 4] {
        let m = &self.camera_to_world;
        std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
    }
}

/// Frame ids used when broadcasting a device's transforms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameIds {
    /// Parent frame, e.g. `hololens2_world`
    pub world: String,
    /// Child frame, e.g. `hololens2_depth_optical_frame`
    pub optical: String,
}

impl FrameIds {
    pub fn new(serial: &str, modality: Modality) -> Self {
        Self {
            world: format!("{serial}_world"),
            optical: format!("{serial}_{modality}_optical_frame"),
        }
    }
}

/// Translation + quaternion with frame ids and a stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedTransform {
    /// Seconds since the Unix epoch
    pub stamp_secs: f64,
    pub parent_frame: String,
    pub child_frame: String,
    pub translation: [f32; 3],
    /// (x, y, z, w)
    pub rotation: [f32; 4],
}

impl StampedTransform {
    pub fn from_pose(pose: &Pose, stamp_secs: f64, ids: &FrameIds) -> Self {
        let t = pose.translation();
        let q = pose.quaternion().into_inner().coords;
        Self {
            stamp_secs,
            parent_frame: ids.world.clone(),
            child_frame: ids.optical.clone(),
            translation: [t.x, t.y, t.z],
            rotation: [q.x, q.y, q.z, q.w],
        }
    }
}

/// Calibration message accompanying color images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub stamp_secs: f64,
    pub frame_id: String,
    pub width: u32,
    pub height: u32,
    pub distortion_model: String,
    /// Row-major 3x3 camera matrix
    pub k: [f32; 9],
    /// Row-major 3x4 projection matrix
    pub p: [f32; 12],
}

impl CameraInfo {
    pub fn new(
        intrinsics: &Intrinsics,
        width: u32,
        height: u32,
        stamp_secs: f64,
        frame_id: impl Into<String>,
    ) -> Self {
        let k = intrinsics.camera_matrix();
        Self {
            stamp_secs,
            frame_id: frame_id.into(),
            width,
            height,
            distortion_model: "plumb_bob".to_string(),
            k: std::array::from_fn(|i| k[(i / 3, i % 3)]),
            p: intrinsics.projection(),
        }
    }
}
