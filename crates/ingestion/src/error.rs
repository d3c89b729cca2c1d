//! Ingestion 错误类型

use contracts::{Modality, SensorEndpoint};
use pose_engine::PoseError;
use thiserror::Error;

pub use contracts::StreamError;

/// 会话构造错误 (读循环内的错误见 [`StreamError`])
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 姿态引擎的模态与端点不一致
    #[error("pose engine for {engine} cannot serve {endpoint:?}")]
    ModalityMismatch {
        /// 端点
        endpoint: SensorEndpoint,
        /// 姿态引擎的模态
        engine: Modality,
    },

    /// 标定无效或缺失
    #[error(transparent)]
    Pose(#[from] PoseError),
}

/// 读循环 Result 类型别名
pub type Result<T> = std::result::Result<T, StreamError>;
