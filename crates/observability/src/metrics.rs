//! 光照传感器指标收集模块
//!
//! 记录帧处理结果、已发布读数与 sink 写入，并在内存中聚合运行统计。

use std::collections::BTreeMap;

use contracts::IlluminanceReading;
use metrics::{counter, gauge, histogram};

/// 记录宿主交付的一帧
pub fn record_frame_received(sensor: &str) {
    counter!(
        "light_sensor_frames_received_total",
        "sensor" => sensor.to_string()
    )
    .increment(1);
}

/// 记录一帧的处理结果 (inactive / activated / no_subscribers / throttled / published / rejected ...)
pub fn record_frame_outcome(sensor: &str, outcome: &'static str) {
    counter!(
        "light_sensor_frame_outcomes_total",
        "sensor" => sensor.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录已发布的照度读数
///
/// # Example
///
/// ```ignore
/// if let FrameOutcome::Published(reading) = plugin.process_frame(...) {
///     record_reading_published("light_cam", &reading);
/// }
/// ```
pub fn record_reading_published(sensor: &str, reading: &IlluminanceReading) {
    counter!(
        "light_sensor_readings_published_total",
        "sensor" => sensor.to_string()
    )
    .increment(1);

    gauge!(
        "light_sensor_illuminance",
        "sensor" => sensor.to_string()
    )
    .set(reading.illuminance);

    gauge!(
        "light_sensor_last_seq",
        "sensor" => sensor.to_string()
    )
    .set(reading.seq() as f64);

    histogram!(
        "light_sensor_illuminance_hist",
        "sensor" => sensor.to_string()
    )
    .record(reading.illuminance);
}

/// 记录 sink 写入
pub fn record_sink_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "light_sensor_sink_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 照度运行统计聚合器
///
/// 在内存中聚合帧处理结果和读数，便于输出运行摘要。
#[derive(Debug, Clone, Default)]
pub struct IlluminanceAggregator {
    /// 总帧数
    pub total_frames: u64,

    /// 各处理结果计数
    pub outcomes: BTreeMap<String, u64>,

    /// 已发布读数
    pub published: u64,

    /// 照度统计
    pub illuminance: RunningStats,

    /// 最近一次发布的序号
    pub last_seq: Option<u32>,
}

impl IlluminanceAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧的处理结果
    pub fn record_outcome(&mut self, outcome: &str) {
        self.total_frames += 1;
        *self.outcomes.entry(outcome.to_string()).or_insert(0) += 1;
    }

    /// 记录一个读数
    pub fn record_reading(&mut self, reading: &IlluminanceReading) {
        self.published += 1;
        self.illuminance.push(reading.illuminance);
        self.last_seq = Some(reading.seq());
    }

    /// 生成摘要报告
    pub fn summary(&self) -> IlluminanceSummary {
        IlluminanceSummary {
            total_frames: self.total_frames,
            published: self.published,
            publish_rate: if self.total_frames > 0 {
                self.published as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            outcomes: self.outcomes.clone(),
            illuminance: StatsSummary::from(&self.illuminance),
            last_seq: self.last_seq,
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct IlluminanceSummary {
    pub total_frames: u64,
    pub published: u64,
    pub publish_rate: f64,
    pub outcomes: BTreeMap<String, u64>,
    pub illuminance: StatsSummary,
    pub last_seq: Option<u32>,
}

impl std::fmt::Display for IlluminanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Light Sensor Summary ===")?;
        writeln!(f, "Frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Readings published: {} ({:.2}%)",
            self.published, self.publish_rate
        )?;
        if let Some(seq) = self.last_seq {
            writeln!(f, "Last seq: {}", seq)?;
        }
        writeln!(f, "Illuminance: {}", self.illuminance)?;

        if !self.outcomes.is_empty() {
            writeln!(f, "Outcomes:")?;
            for (outcome, count) in &self.outcomes {
                writeln!(f, "  {}: {}", outcome, count)?;
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

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
