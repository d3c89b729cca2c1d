//! 流指标收集模块
//!
//! 会话读循环与 sink 在关键节点调用这里的函数记录指标。

use std::collections::HashMap;

use contracts::{DisconnectKind, Modality};
use metrics::{counter, gauge, histogram};

/// 记录一帧成功接收
///
/// `bytes` 为 header + payload 字节数，`stamp_secs` 为帧的 Unix 时间戳。
pub fn record_frame_received(modality: Modality, bytes: u64, stamp_secs: f64) {
    counter!("holostream_frames_total", "modality" => modality.as_str()).increment(1);
    counter!("holostream_bytes_total", "modality" => modality.as_str()).increment(bytes);
    gauge!("holostream_last_frame_timestamp_seconds", "modality" => modality.as_str())
        .set(stamp_secs);
}

/// 记录连接尝试结果
pub fn record_connect(modality: Modality, success: bool) {
    if success {
        counter!("holostream_connects_total", "modality" => modality.as_str()).increment(1);
    } else {
        counter!("holostream_connect_failures_total", "modality" => modality.as_str())
            .increment(1);
    }
}

/// 记录断线，按 transient / protocol 分类
pub fn record_disconnect(modality: Modality, kind: DisconnectKind) {
    counter!(
        "holostream_disconnects_total",
        "modality" => modality.as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// 记录帧分发到 sink 的结果
pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "holostream_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录相邻两帧的设备时间间隔
pub fn record_frame_interval_ms(modality: Modality, interval_ms: f64) {
    histogram!("holostream_frame_interval_ms", "modality" => modality.as_str())
        .record(interval_ms);
}

/// 流指标聚合器
///
/// 在内存中按模态聚合帧数、字节数与帧间隔，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct StreamMetricsAggregator {
    streams: HashMap<Modality, StreamAggregate>,
}

#[derive(Debug, Clone, Default)]
struct StreamAggregate {
    frames: u64,
    bytes: u64,
    last_stamp: Option<f64>,
    interval_ms: RunningStats,
}

impl StreamMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计，返回与上一帧的间隔 (毫秒)
    pub fn update(&mut self, modality: Modality, stamp_secs: f64, bytes: u64) -> Option<f64> {
        let entry = self.streams.entry(modality).or_default();
        entry.frames += 1;
        entry.bytes += bytes;

        let interval = entry
            .last_stamp
            .map(|last| (stamp_secs - last) * 1000.0)
            .filter(|ms| *ms >= 0.0);
        if let Some(ms) = interval {
            entry.interval_ms.push(ms);
        }
        entry.last_stamp = Some(stamp_secs);
        interval
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let mut streams: Vec<_> = self
            .streams
            .iter()
            .map(|(modality, agg)| StreamSummary {
                modality: *modality,
                frames: agg.frames,
                bytes: agg.bytes,
                interval_ms: StatsSummary::from(&agg.interval_ms),
            })
            .collect();
        streams.sort_by_key(|s| s.modality.as_str());
        MetricsSummary { streams }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub streams: Vec<StreamSummary>,
}

/// 单个模态的摘要
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub modality: Modality,
    pub frames: u64,
    pub bytes: u64,
    pub interval_ms: StatsSummary,
}

impl StreamSummary {
    /// 平均帧率，由平均帧间隔推算
    pub fn mean_fps(&self) -> Option<f64> {
        (self.interval_ms.count > 0 && self.interval_ms.mean > 0.0)
            .then(|| 1000.0 / self.interval_ms.mean)
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Stream Metrics Summary ===")?;
        if self.streams.is_empty() {
            writeln!(f, "No frames received")?;
        }
        for s in &self.streams {
            writeln!(f, "[{}]", s.modality)?;
            writeln!(f, "  Frames: {}", s.frames)?;
            writeln!(f, "  Bytes: {}", s.bytes)?;
            writeln!(f, "  Frame interval (ms): {}", s.interval_ms)?;
            if let Some(fps) = s.mean_fps() {
                writeln!(f, "  Mean rate: {fps:.2} fps")?;
            }
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
