//! Pose engine error types

use contracts::{ContractError, Modality};
use thiserror::Error;

/// Pose engine errors (construction time only; composing a pose cannot fail)
#[derive(Debug, Error)]
pub enum PoseError {
    /// Calibration does not hold 16 values
    #[error("calibration must have 16 values, got {len}")]
    CalibrationShape { len: usize },

    /// Calibration value is NaN or infinite
    #[error("calibration value at index {index} is not finite")]
    CalibrationNotFinite { index: usize },

    /// rig_to_depth has no inverse
    #[error("calibration matrix is not invertible")]
    SingularCalibration,

    /// Modality needs extrinsics that were not supplied
    #[error("{modality} pose requires calibration extrinsics")]
    MissingCalibration { modality: Modality },
}

impl From<PoseError> for ContractError {
    fn from(err: PoseError) -> Self {
        ContractError::config_validation("calibration.rig_to_depth", err.to_string())
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, PoseError>;
