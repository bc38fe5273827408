//! FrameDriver - 模拟宿主的渲染循环
//!
//! 每个 tick 推进仿真时钟、更新相机时间并把一帧交给插件。
//! 第 n 帧的时间由帧序号直接算出 (`origin + n / rate`)，不逐帧累加步长。

use std::sync::Arc;
use std::time::Duration;

use contracts::{CameraGeometry, CameraSensor, ContractError, Frame, SimClock, SimTime};

use crate::mock::{ManualClock, MockCamera};
use crate::plugin::{FrameOutcome, LightSensorPlugin};

/// 渲染频率为 0 时使用的频率 (Hz)
const DEFAULT_FRAME_RATE: f64 = 30.0;

const NANOS_PER_SEC: f64 = 1e9;

/// 帧图案
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePattern {
    /// 全部采样为同一值
    Uniform(u8),
    /// 从左到右 0..=255 渐变
    HorizontalGradient,
    /// 黑白棋盘格，参数为格子边长
    Checkerboard(u32),
    /// 固定的原始数据 (长度须与几何一致)
    Still(Vec<u8>),
}

impl Default for FramePattern {
    fn default() -> Self {
        Self::Uniform(128)
    }
}

impl FramePattern {
    /// 按几何参数渲染整帧
    ///
    /// 多通道格式每个通道写入相同的值。
    pub fn render(&self, geometry: &CameraGeometry) -> Result<Vec<u8>, ContractError> {
        let width = geometry.width as usize;
        let height = geometry.height as usize;
        let depth = geometry.depth as usize;

        let value_at = |x: usize, y: usize| -> u8 {
            match self {
                Self::Uniform(value) => *value,
                Self::HorizontalGradient => {
                    if width <= 1 {
                        0
                    } else {
                        (x * 255 / (width - 1)) as u8
                    }
                }
                Self::Checkerboard(cell) => {
                    let cell = (*cell).max(1) as usize;
                    if (x / cell + y / cell) % 2 == 0 {
                        255
                    } else {
                        0
                    }
                }
                Self::Still(_) => 0,
            }
        };

        if let Self::Still(data) = self {
            if data.len() != geometry.frame_len() {
                return Err(ContractError::config_validation(
                    "image",
                    format!(
                        "still frame has {} bytes, expected {} for {}x{} {}",
                        data.len(),
                        geometry.frame_len(),
                        geometry.width,
                        geometry.height,
                        geometry.format
                    ),
                ));
            }
            return Ok(data.clone());
        }

        let mut frame = Vec::with_capacity(geometry.frame_len());
        for y in 0..height {
            for x in 0..width {
                let value = value_at(x, y);
                frame.extend(std::iter::repeat_n(value, depth));
            }
        }
        Ok(frame)
    }
}

/// 帧驱动器
pub struct FrameDriver {
    camera: Arc<MockCamera>,
    clock: Arc<ManualClock>,
    geometry: CameraGeometry,
    rate: f64,
    origin: SimTime,
    frame: Vec<u8>,
    delivered: u64,
}

impl FrameDriver {
    /// 创建驱动器
    ///
    /// `sensor_rate` 为相机渲染频率 (Hz)。
    pub fn new(
        camera: Arc<MockCamera>,
        clock: Arc<ManualClock>,
        sensor_rate: f64,
        pattern: &FramePattern,
    ) -> Result<Self, ContractError> {
        let geometry = camera.geometry();
        let frame = pattern.render(&geometry)?;
        let rate = if sensor_rate > 0.0 && sensor_rate.is_finite() {
            sensor_rate
        } else {
            DEFAULT_FRAME_RATE
        };
        let origin = clock.sim_time();

        Ok(Self {
            camera,
            clock,
            geometry,
            rate,
            origin,
            frame,
            delivered: 0,
        })
    }

    /// 名义帧间隔
    pub fn step(&self) -> Duration {
        self.frame_offset(1)
    }

    /// 第 `index` 帧相对起点的时间，四舍五入到纳秒
    fn frame_offset(&self, index: u64) -> Duration {
        Duration::from_nanos((index as f64 * NANOS_PER_SEC / self.rate).round() as u64)
    }

    /// 已交付的帧数
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// 当前仿真时间
    pub fn now(&self) -> SimTime {
        self.clock.sim_time()
    }

    /// 替换帧内容
    pub fn set_pattern(&mut self, pattern: &FramePattern) -> Result<(), ContractError> {
        self.frame = pattern.render(&self.geometry)?;
        Ok(())
    }

    /// 推进一帧并交给插件
    pub fn tick(&mut self, plugin: &mut LightSensorPlugin) -> FrameOutcome {
        self.delivered += 1;
        let now = self.origin.saturating_add(self.frame_offset(self.delivered));
        self.clock.set(now);
        self.camera.set_last_update_time(now);

        plugin.process_frame(Frame::new(
            &self.frame,
            self.geometry.width,
            self.geometry.height,
            self.geometry.depth,
            self.geometry.format.as_str(),
        ))
    }
}

impl std::fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("geometry", &self.geometry)
            .field("rate", &self.rate)
            .field("delivered", &self.delivered)
            .finish()
    }
}
