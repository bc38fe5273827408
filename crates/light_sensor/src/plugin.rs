//! LightSensorPlugin - 挂在相机传感器上的光照传感器
//!
//! 每帧依次判断：是否已加载、传感器是否激活、是否有订阅者、是否被节流，
//! 全部通过后归约采样窗口并发布一条照度读数。

use std::sync::Arc;

use contracts::{
    ContractError, Frame, FrameSink, IlluminanceReading, Lifecycle, LightSensorConfig,
    ReadingPublisher, SamplingWindow, SensorHandle,
};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::context::{scoped_topic, CameraContext};
use crate::metrics::PluginMetrics;
use crate::reducer::FrameReducer;
use crate::throttle::Throttle;

/// 读数话题队列长度
const READING_QUEUE_SIZE: usize = 1;

/// 传感器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorState {
    /// 未激活，不处理帧
    #[default]
    Inactive,
    /// 已激活，等待订阅者或节流周期
    ActiveIdle,
    /// 正在构建并发布读数
    ActivePublishing,
}

/// 单帧处理结果
#[derive(Debug)]
pub enum FrameOutcome {
    /// 插件尚未加载 (或已卸载)
    NotLoaded,
    /// 传感器未激活且无人订阅
    Inactive,
    /// 本帧触发了传感器激活，帧本身不处理
    Activated,
    /// 已激活但没有订阅者
    NoSubscribers,
    /// 距上次发布不足一个周期
    Throttled,
    /// 采样窗口不在帧内
    Rejected(ContractError),
    /// 已发布
    Published(IlluminanceReading),
}

impl FrameOutcome {
    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::Inactive => "inactive",
            Self::Activated => "activated",
            Self::NoSubscribers => "no_subscribers",
            Self::Throttled => "throttled",
            Self::Rejected(_) => "rejected",
            Self::Published(_) => "published",
        }
    }

    /// 已发布的读数
    pub fn reading(&self) -> Option<&IlluminanceReading> {
        match self {
            Self::Published(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// 加载成功后持有的全部资源
struct Loaded {
    handle: SensorHandle,
    reducer: FrameReducer,
    throttle: Throttle,
    camera: CameraContext,
    publisher: Box<dyn ReadingPublisher>,
}

/// 光照传感器插件
///
/// 宿主在自己的更新线程上串行调用回调，插件状态只通过 `&mut self` 修改。
///
/// # Example
///
/// ```ignore
/// let mut plugin = LightSensorPlugin::new();
/// plugin.on_load(handle, &config)?;
/// // 宿主每渲染一帧：
/// plugin.on_new_frame(&pixels, 64, 48, 1, "L8");
/// ```
pub struct LightSensorPlugin {
    name: String,
    loaded: Option<Loaded>,
    seq: u32,
    state: SensorState,
    metrics: Arc<PluginMetrics>,
}

impl Default for LightSensorPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl LightSensorPlugin {
    /// 创建未加载的插件实例
    pub fn new() -> Self {
        Self {
            name: "light_sensor".to_string(),
            loaded: None,
            seq: 0,
            state: SensorState::Inactive,
            metrics: Arc::new(PluginMetrics::new()),
        }
    }

    /// 实例名 (加载后为父传感器名)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    /// 下一条读数使用的序号
    pub fn sequence(&self) -> u32 {
        self.seq
    }

    pub fn metrics(&self) -> Arc<PluginMetrics> {
        self.metrics.clone()
    }

    /// 读数话题 (已加载时)
    pub fn reading_topic(&self) -> Option<&str> {
        self.loaded.as_ref().map(|loaded| loaded.publisher.topic())
    }

    /// 相机上下文 (已加载时)
    pub fn camera(&self) -> Option<&CameraContext> {
        self.loaded.as_ref().map(|loaded| &loaded.camera)
    }

    /// 处理一帧并返回结果
    pub fn process_frame(&mut self, frame: Frame<'_>) -> FrameOutcome {
        self.metrics.record_received();
        observability::record_frame_received(&self.name);

        let outcome = self.evaluate(frame);

        match &outcome {
            FrameOutcome::NotLoaded => self.metrics.record_not_loaded(),
            FrameOutcome::Inactive => self.metrics.record_inactive(),
            FrameOutcome::Activated => self.metrics.record_activation(),
            FrameOutcome::NoSubscribers => self.metrics.record_idle(),
            FrameOutcome::Throttled => self.metrics.record_throttled(),
            FrameOutcome::Rejected(_) => self.metrics.record_rejected(),
            FrameOutcome::Published(reading) => {
                self.metrics.record_published();
                observability::record_reading_published(&self.name, reading);
            }
        }
        observability::record_frame_outcome(&self.name, outcome.label());

        outcome
    }

    fn evaluate(&mut self, frame: Frame<'_>) -> FrameOutcome {
        let Some(loaded) = self.loaded.as_mut() else {
            debug!(plugin = %self.name, "frame received before load, ignored");
            return FrameOutcome::NotLoaded;
        };

        let sensor = loaded.handle.sensor.clone();
        loaded
            .camera
            .set_sensor_update_time(sensor.last_update_time());

        // 读数话题的订阅者也算连接，只订阅照度的消费者同样能激活传感器。
        // 相机信息话题的订阅者不计入。
        let connections = loaded.camera.connection_count() + loaded.publisher.subscriber_count();

        if !sensor.is_active() {
            if connections > 0 {
                sensor.set_active(true);
                self.state = SensorState::ActiveIdle;
                debug!(sensor = %self.name, connections, "sensor activated");
                return FrameOutcome::Activated;
            }
            self.state = SensorState::Inactive;
            return FrameOutcome::Inactive;
        }

        self.state = SensorState::ActiveIdle;
        if connections == 0 {
            return FrameOutcome::NoSubscribers;
        }

        let now = loaded.handle.clock.sim_time();
        if !loaded.throttle.ready(now) {
            trace!(
                sensor = %self.name,
                elapsed = ?loaded.throttle.elapsed(now),
                period = ?loaded.throttle.period(),
                "frame throttled"
            );
            return FrameOutcome::Throttled;
        }

        let window: SamplingWindow = match loaded.reducer.locate(&frame) {
            Ok(window) => window,
            Err(err) => {
                warn!(
                    sensor = %self.name,
                    width = frame.width(),
                    height = frame.height(),
                    len = frame.len(),
                    error = %err,
                    "frame rejected"
                );
                return FrameOutcome::Rejected(err);
            }
        };

        self.state = SensorState::ActivePublishing;

        loaded.camera.put_camera_data(frame.data());
        loaded.camera.publish_camera_info();
        loaded.throttle.mark(now);

        let illuminance = loaded.reducer.reduce_window(&frame, &window);
        let reading = IlluminanceReading::new(self.seq, loaded.handle.runtime.now(), illuminance);
        loaded.publisher.publish(reading.clone());

        trace!(sensor = %self.name, seq = self.seq, illuminance, "reading published");
        self.seq = self.seq.wrapping_add(1);
        self.state = SensorState::ActiveIdle;

        FrameOutcome::Published(reading)
    }
}

/// 加载前的参数检查
fn check_config(config: &LightSensorConfig) -> Result<(), ContractError> {
    if !config.update_rate.is_finite() || config.update_rate < 0.0 {
        return Err(ContractError::config_validation(
            "update_rate",
            "update_rate must be a finite value >= 0",
        ));
    }
    if !config.range.is_finite() || config.range < 0.0 {
        return Err(ContractError::config_validation(
            "range",
            "range must be a finite value >= 0",
        ));
    }
    for (field, value) in [
        ("topic_name", &config.topic_name),
        ("image_topic_name", &config.image_topic_name),
        ("camera_info_topic_name", &config.camera_info_topic_name),
    ] {
        if value.is_empty() {
            return Err(ContractError::config_validation(
                field,
                format!("{field} cannot be empty"),
            ));
        }
    }
    Ok(())
}

impl Lifecycle for LightSensorPlugin {
    #[instrument(name = "light_sensor_load", skip_all, fields(sensor = %handle.sensor.name()))]
    fn on_load(
        &mut self,
        handle: SensorHandle,
        config: &LightSensorConfig,
    ) -> Result<(), ContractError> {
        if self.loaded.is_some() {
            self.on_unload();
        }

        if !handle.runtime.is_initialized() {
            error!("messaging runtime not initialized, unable to load light sensor plugin");
            return Err(ContractError::runtime_not_initialized(
                "start the messaging runtime before loading the plugin",
            ));
        }

        check_config(config)?;
        let reducer = FrameReducer::new(config.fov, config.window_origin)?;

        let geometry = handle.sensor.geometry();
        let frame_len = geometry.checked_frame_len().ok_or_else(|| {
            ContractError::config_validation(
                "image",
                format!(
                    "{}x{} {} frame size overflows",
                    geometry.width, geometry.height, geometry.format
                ),
            )
        })?;
        SamplingWindow::locate(
            config.fov,
            config.window_origin,
            geometry.width,
            geometry.height,
            frame_len,
        )?;

        let sensor_name = handle.sensor.name().to_string();
        let runtime = handle.runtime.clone();

        let reading_topic = scoped_topic(&config.robot_namespace, &config.topic_name);
        let publisher = runtime.advertise_readings(&reading_topic, READING_QUEUE_SIZE)?;
        let camera = CameraContext::advertise(runtime.as_ref(), geometry, &sensor_name, config)?;

        let throttle = Throttle::new(camera.update_period(), handle.clock.sim_time());

        info!(
            topic = %publisher.topic(),
            image_topic = %camera.image_topic(),
            info_topic = %camera.info_topic(),
            fov = config.fov,
            origin = ?config.window_origin,
            update_rate = config.update_rate,
            width = geometry.width,
            height = geometry.height,
            format = %geometry.format,
            "light sensor plugin loaded"
        );

        self.state = if handle.sensor.is_active() {
            SensorState::ActiveIdle
        } else {
            SensorState::Inactive
        };
        self.name = sensor_name;
        self.loaded = Some(Loaded {
            handle,
            reducer,
            throttle,
            camera,
            publisher,
        });

        Ok(())
    }

    fn on_unload(&mut self) {
        if self.loaded.take().is_some() {
            debug!(sensor = %self.name, published = self.seq, "light sensor plugin unloaded");
        }
        self.state = SensorState::Inactive;
    }
}

impl FrameSink for LightSensorPlugin {
    fn on_new_frame(&mut self, image: &[u8], width: u32, height: u32, depth: u32, format: &str) {
        let _ = self.process_frame(Frame::new(image, width, height, depth, format));
    }
}
