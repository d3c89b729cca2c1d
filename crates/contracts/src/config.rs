//! StreamerConfig - Config Loader output
//!
//! 描述完整的采集配置：设备地址、连接参数、各模态端口、标定、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{Modality, SensorEndpoint, DEFAULT_COLOR_PORT, DEFAULT_DEPTH_PORT};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 设备设置
    pub device: DeviceConfig,

    /// 连接参数
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// 各模态的流配置
    #[serde(default)]
    pub streams: StreamsConfig,

    /// 深度相机标定
    #[serde(default)]
    pub calibration: Option<CalibrationConfig>,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 设备配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 设备 IP 地址或主机名
    pub host: String,

    /// 设备序列号，用作 frame id 前缀
    #[serde(default = "default_serial")]
    pub serial: String,
}

/// 未配置序列号时使用的 frame id 前缀
pub const DEFAULT_SERIAL: &str = "hololens2";

fn default_serial() -> String {
    DEFAULT_SERIAL.to_string()
}

/// 连接参数 (毫秒)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// TCP 连接超时
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// 读超时，超时视为 ShortRead
    #[serde(default = "default_timeout_ms")]
    pub read_timeout_ms: u64,

    /// 断线后重连间隔 (固定，不退避)
    #[serde(default = "default_timeout_ms")]
    pub reconnect_delay_ms: u64,

    /// 单帧载荷上限，超过视为协议错误
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_max_payload_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_timeout_ms(),
            read_timeout_ms: default_timeout_ms(),
            reconnect_delay_ms: default_timeout_ms(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// 各模态的流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamsConfig {
    #[serde(default = "default_color_stream")]
    pub color: StreamConfig,

    #[serde(default = "default_depth_stream")]
    pub depth: StreamConfig,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            color: default_color_stream(),
            depth: default_depth_stream(),
        }
    }
}

fn default_color_stream() -> StreamConfig {
    StreamConfig {
        enabled: true,
        port: DEFAULT_COLOR_PORT,
    }
}

fn default_depth_stream() -> StreamConfig {
    StreamConfig {
        enabled: true,
        port: DEFAULT_DEPTH_PORT,
    }
}

/// 单个模态的流配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 设备端口
    pub port: u16,
}

fn default_enabled() -> bool {
    true
}

impl StreamsConfig {
    pub fn get(&self, modality: Modality) -> &StreamConfig {
        match modality {
            Modality::Color => &self.color,
            Modality::Depth => &self.depth,
        }
    }

    pub fn get_mut(&mut self, modality: Modality) -> &mut StreamConfig {
        match modality {
            Modality::Color => &mut self.color,
            Modality::Depth => &mut self.depth,
        }
    }

    /// 已启用模态的端点
    pub fn enabled_endpoints(&self) -> Vec<SensorEndpoint> {
        Modality::ALL
            .into_iter()
            .filter(|m| self.get(*m).enabled)
            .map(|m| SensorEndpoint::new(m, self.get(m).port))
            .collect()
    }
}

/// 深度相机外参
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// rig -> depth 变换，16 个浮点数，行优先
    pub rig_to_depth: Vec<f32>,
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 仅对这些模态生效 (空 = 全部)
    #[serde(default)]
    pub modalities: Vec<Modality>,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    pub fn applies_to(&self, modality: Modality) -> bool {
        self.modalities.is_empty() || self.modalities.contains(&modality)
    }
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出
    File,
}

impl StreamerConfig {
    /// 仅包含设备地址、其余取默认值的配置
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            device: DeviceConfig {
                host: host.into(),
                serial: default_serial(),
            },
            connection: ConnectionConfig::default(),
            streams: StreamsConfig::default(),
            calibration: None,
            sinks: Vec::new(),
        }
    }
}
