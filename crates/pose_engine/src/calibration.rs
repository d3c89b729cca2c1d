//! Static depth-sensor extrinsics.

use contracts::CalibrationConfig;
use nalgebra::Matrix4;

use crate::error::{PoseError, Result};

/// Depth extrinsics relative to the rig
///
/// Supplied as `rig_to_depth`; the inverse is computed once here and reused
/// for every depth frame of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationExtrinsics {
    rig_to_depth: Matrix4<f32>,
    depth_to_rig: Matrix4<f32>,
}

impl CalibrationExtrinsics {
    /// Build from a `rig_to_depth` matrix
    pub fn new(rig_to_depth: Matrix4<f32>) -> Result<Self> {
        let depth_to_rig = rig_to_depth
            .try_inverse()
            .ok_or(PoseError::SingularCalibration)?;
        Ok(Self {
            rig_to_depth,
            depth_to_rig,
        })
    }

    /// Build from 16 row-major floats
    pub fn from_row_major(values: &[f32]) -> Result<Self> {
        if values.len() != 16 {
            return Err(PoseError::CalibrationShape { len: values.len() });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PoseError::CalibrationNotFinite { index });
        }
        Self::new(Matrix4::from_row_slice(values))
    }

    pub fn from_config(config: &CalibrationConfig) -> Result<Self> {
        Self::from_row_major(&config.rig_to_depth)
    }

    pub fn rig_to_depth(&self) -> &Matrix4<f32> {
        &self.rig_to_depth
    }

    pub fn depth_to_rig(&self) -> &Matrix4<f32> {
        &self.depth_to_rig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIG_TO_DEPTH: [f32; 16] = [
        0.022_715_6, -0.999_57, -0.018_523_6, -0.059_166_2, //
        0.960_999, 0.026_939_6, -0.275_235, -0.015_487_4, //
        0.275_616, -0.011_549_1, 0.961_198, -0.017_884_8, //
        0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn test_inverse_cached() {
        let calib = CalibrationExtrinsics::from_row_major(&RIG_TO_DEPTH).unwrap();
        let product = calib.rig_to_depth() * calib.depth_to_rig();
        assert!((product - Matrix4::identity()).abs().max() < 1e-5);
        // row-major input: translation lands in the last column
        assert!((calib.rig_to_depth()[(0, 3)] + 0.059_166_2).abs() < 1e-7);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            CalibrationExtrinsics::from_row_major(&[1.0; 9]),
            Err(PoseError::CalibrationShape { len: 9 })
        ));

        let mut values = RIG_TO_DEPTH;
        values[5] = f32::NAN;
        assert!(matches!(
            CalibrationExtrinsics::from_row_major(&values),
            Err(PoseError::CalibrationNotFinite { index: 5 })
        ));

        assert!(matches!(
            CalibrationExtrinsics::new(Matrix4::zeros()),
            Err(PoseError::SingularCalibration)
        ));
    }
}
