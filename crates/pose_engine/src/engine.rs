//! Per-session pose composition.

use contracts::{FrameHeader, Modality, Pose};
use nalgebra::Matrix4;
use tracing::trace;

use crate::basis::{header_matrix, matrix_from_rows, CAM_CONV, WORLD_CONV};
use crate::calibration::CalibrationExtrinsics;
use crate::error::{PoseError, Result};

/// Result of composing one header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedPose {
    /// Camera-to-world in the target world frame
    pub pose: Pose,
    /// Header matrix after reshape + transpose, before basis conversion
    pub header_transform: Matrix4<f32>,
}

/// Pose composer bound to one modality
///
/// Holds every constant factor of the composition so the per-frame work is
/// two matrix products:
///
/// - color: `WORLD_CONV * device_to_world * CAM_CONV`
/// - depth: `WORLD_CONV * rig_to_world * depth_to_rig`
#[derive(Debug, Clone)]
pub struct PoseEngine {
    modality: Modality,
    world_conv: Matrix4<f32>,
    /// Right-hand factor: camera basis flip (color) or depth_to_rig (depth)
    sensor_to_header: Matrix4<f32>,
}

impl PoseEngine {
    /// Composer for color frames
    pub fn color() -> Self {
        Self {
            modality: Modality::Color,
            world_conv: matrix_from_rows(&WORLD_CONV),
            sensor_to_header: matrix_from_rows(&CAM_CONV),
        }
    }

    /// Composer for depth frames
    pub fn depth(extrinsics: &CalibrationExtrinsics) -> Self {
        Self {
            modality: Modality::Depth,
            world_conv: matrix_from_rows(&WORLD_CONV),
            sensor_to_header: *extrinsics.depth_to_rig(),
        }
    }

    /// Composer for `modality`; depth requires extrinsics
    pub fn for_modality(
        modality: Modality,
        extrinsics: Option<&CalibrationExtrinsics>,
    ) -> Result<Self> {
        match modality {
            Modality::Color => Ok(Self::color()),
            Modality::Depth => extrinsics
                .map(Self::depth)
                .ok_or(PoseError::MissingCalibration { modality }),
        }
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Compose the pose for one decoded header
    pub fn compute(&self, header: &FrameHeader) -> ComputedPose {
        debug_assert_eq!(header.modality(), self.modality);

        let header_transform = header_matrix(header.raw_transform());
        let camera_to_world = self.world_conv * header_transform * self.sensor_to_header;
        trace!(
            modality = %self.modality,
            timestamp = header.timestamp(),
            "pose composed"
        );

        ComputedPose {
            pose: Pose::new(camera_to_world),
            header_transform,
        }
    }
}

/// One-shot composition without a cached engine
pub fn compute_pose(
    header: &FrameHeader,
    extrinsics: Option<&CalibrationExtrinsics>,
) -> Result<Pose> {
    let engine = PoseEngine::for_modality(header.modality(), extrinsics)?;
    Ok(engine.compute(header).pose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ColorHeader, DepthHeader, ImageLayout, Intrinsics};
    use nalgebra::Vector3;

    const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    fn color_header(device_to_world: [f32; 16]) -> FrameHeader {
        FrameHeader::Color(ColorHeader {
            timestamp: 1,
            layout: ImageLayout {
                width: 4,
                height: 2,
                pixel_stride: 3,
                row_stride: 12,
            },
            intrinsics: Intrinsics {
                fx: 1.0,
                fy: 1.0,
                cx: 2.0,
                cy: 1.0,
            },
            device_to_world,
        })
    }

    fn depth_header(rig_to_world: [f32; 16]) -> FrameHeader {
        FrameHeader::Depth(DepthHeader {
            timestamp: 1,
            layout: ImageLayout {
                width: 4,
                height: 2,
                pixel_stride: 2,
                row_stride: 8,
            },
            rig_to_world,
        })
    }

    fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn test_identity_color_is_closed_form() {
        let computed = PoseEngine::color().compute(&color_header(IDENTITY));
        let expected = Matrix4::new(
            0.0, 0.0, 1.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        assert_eq!(computed.pose.camera_to_world, expected);
        assert_eq!(
            computed.pose.camera_to_world,
            matrix_from_rows(&WORLD_CONV) * matrix_from_rows(&CAM_CONV)
        );
        assert_eq!(computed.header_transform, Matrix4::identity());
    }

    #[test]
    fn test_color_translation_in_target_world() {
        // column-major on the wire: translation in slots 12..15
        let mut raw = IDENTITY;
        raw[12] = 1.0;
        raw[13] = 2.0;
        raw[14] = 3.0;

        let computed = PoseEngine::color().compute(&color_header(raw));
        assert_eq!(computed.header_transform, translation(1.0, 2.0, 3.0));
        // device (x, y, z) -> target (-z, -x, y)
        assert_eq!(computed.pose.translation(), Vector3::new(-3.0, -1.0, 2.0));
    }

    #[test]
    fn test_depth_applies_inverse_calibration() {
        let calib = CalibrationExtrinsics::new(translation(0.1, 0.0, 0.0)).unwrap();
        let engine = PoseEngine::depth(&calib);
        assert_eq!(engine.modality(), Modality::Depth);

        let pose = engine.compute(&depth_header(IDENTITY)).pose;
        let t = pose.translation();
        // depth_to_rig shifts by -0.1 along device x, which is target -y
        assert!(t.x.abs() < 1e-6);
        assert!((t.y - 0.1).abs() < 1e-6);
        assert!(t.z.abs() < 1e-6);
        let expected = matrix_from_rows(&WORLD_CONV).fixed_view::<3, 3>(0, 0).into_owned();
        assert!((pose.rotation() - expected).abs().max() < 1e-6);
    }

    #[test]
    fn test_depth_without_calibration_fails() {
        assert!(matches!(
            PoseEngine::for_modality(Modality::Depth, None),
            Err(PoseError::MissingCalibration {
                modality: Modality::Depth
            })
        ));
        assert!(compute_pose(&depth_header(IDENTITY), None).is_err());
        assert!(compute_pose(&color_header(IDENTITY), None).is_ok());
    }

    #[test]
    fn test_non_orthonormal_rotation_passes_through() {
        let mut raw = IDENTITY;
        raw[0] = 1.5;
        let computed = PoseEngine::color().compute(&color_header(raw));
        let scaled = computed.pose.camera_to_world.column(0).norm();
        assert!((scaled - 1.5).abs() < 1e-6);
    }
}
