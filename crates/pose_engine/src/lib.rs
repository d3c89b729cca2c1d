//! # Pose Engine
//!
//! Camera-to-world poses from the transform embedded in each frame header.
//!
//! 负责：
//! - 设备坐标系 -> 目标坐标系 (x 前, y 左, z 上) 的基变换
//! - 头部 4x4 矩阵的重排与转置
//! - 深度相机外参求逆 (会话启动时一次)
//!
//! ## 使用示例
//!
//! ```ignore
//! use pose_engine::{CalibrationExtrinsics, PoseEngine};
//!
//! let calib = CalibrationExtrinsics::from_row_major(&rig_to_depth)?;
//! let engine = PoseEngine::depth(&calib);
//!
//! let computed = engine.compute(&header);
//! let q = computed.pose.quaternion();
//! ```

mod basis;
mod calibration;
mod engine;
mod error;

pub use basis::{header_matrix, matrix_from_rows, CAM_CONV, WORLD_CONV};
pub use calibration::CalibrationExtrinsics;
pub use engine::{compute_pose, ComputedPose, PoseEngine};
pub use error::{PoseError, Result};
