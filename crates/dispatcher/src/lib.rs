//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 消费会话产出的 `Frame`
//! - Fan-out 到多个 sinks
//! - 单个 sink 失败不影响其他 sink

pub mod error;
pub mod factory;
pub mod metrics;
pub mod sinks;

pub use contracts::{Frame, FrameSink};
pub use error::DispatcherError;
pub use factory::{create_modality_sink, create_sink};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{ChannelSink, ColorImageFormat, FanoutSink, FileSink, FileSinkConfig, LogSink};

#[cfg(test)]
pub(crate) mod test_util {
    use contracts::{
        ColorHeader, DepthHeader, Frame, FrameHeader, ImageLayout, Intrinsics, PixelBuffer, Pose,
    };
    use nalgebra::Matrix4;

    fn layout(pixel_stride: u32) -> ImageLayout {
        ImageLayout {
            width: 2,
            height: 2,
            pixel_stride,
            row_stride: 2 * pixel_stride,
        }
    }

    /// 2x2 depth frame with samples 1000..1003
    pub fn depth_frame(timestamp: i64) -> Frame {
        Frame {
            header: FrameHeader::Depth(DepthHeader {
                timestamp,
                layout: layout(2),
                rig_to_world: [0.0; 16],
            }),
            pixels: PixelBuffer::Depth16 {
                width: 2,
                height: 2,
                samples: vec![1000, 1001, 1002, 1003],
            },
            pose: Pose::identity(),
            header_transform: Matrix4::identity(),
        }
    }

    /// 2x2 BGRA frame, first pixel (10, 20, 30, 255)
    pub fn bgra_frame(timestamp: i64) -> Frame {
        Frame {
            header: FrameHeader::Color(ColorHeader {
                timestamp,
                layout: layout(4),
                intrinsics: Intrinsics {
                    fx: 2.0,
                    fy: 2.0,
                    cx: 1.0,
                    cy: 1.0,
                },
                device_to_world: [0.0; 16],
            }),
            pixels: PixelBuffer::Bgra8 {
                width: 2,
                height: 2,
                data: [10u8, 20, 30, 255].repeat(4),
            },
            pose: Pose::identity(),
            header_transform: Matrix4::identity(),
        }
    }
}
