//! Mock 宿主
//!
//! 不依赖仿真器即可驱动插件：手动推进的时钟、可切换激活状态的相机，
//! 以及记录所有发布内容的消息运行时。

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use contracts::{
    CameraGeometry, CameraImage, CameraInfo, CameraPublisher, CameraSensor, ContractError,
    IlluminanceReading, MessagingRuntime, ReadingPublisher, SimClock, SimTime, Stamp,
};

/// `f64` 的原子存储
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// 仿真时间的原子存储 (纳秒)
#[derive(Debug, Default)]
struct AtomicSimTime(AtomicU64);

fn as_nanos(time: SimTime) -> u64 {
    u64::try_from(time.as_nanos()).unwrap_or(u64::MAX)
}

impl AtomicSimTime {
    fn new(time: SimTime) -> Self {
        Self(AtomicU64::new(as_nanos(time)))
    }

    fn load(&self) -> SimTime {
        Duration::from_nanos(self.0.load(Ordering::Acquire))
    }

    fn store(&self, time: SimTime) {
        self.0.store(as_nanos(time), Ordering::Release);
    }

    fn add(&self, step: Duration) -> SimTime {
        let step = as_nanos(step);
        let prev = self.0.fetch_add(step, Ordering::AcqRel);
        Duration::from_nanos(prev.saturating_add(step))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock 相机传感器
#[derive(Debug)]
pub struct MockCamera {
    name: String,
    geometry: CameraGeometry,
    active: AtomicBool,
    last_update: AtomicSimTime,
}

impl MockCamera {
    pub fn new(name: &str, geometry: CameraGeometry) -> Self {
        Self {
            name: name.to_string(),
            geometry,
            active: AtomicBool::new(false),
            last_update: AtomicSimTime::default(),
        }
    }

    /// 宿主渲染一帧后更新时间
    pub fn set_last_update_time(&self, time: SimTime) {
        self.last_update.store(time);
    }
}

impl CameraSensor for MockCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    fn last_update_time(&self) -> SimTime {
        self.last_update.load()
    }

    fn geometry(&self) -> CameraGeometry {
        self.geometry
    }
}

/// 手动推进的仿真时钟
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicSimTime,
}

impl ManualClock {
    pub fn new(start: SimTime) -> Self {
        Self {
            now: AtomicSimTime::new(start),
        }
    }

    pub fn set(&self, time: SimTime) {
        self.now.store(time);
    }

    /// 前进 `step`，返回新的时间
    pub fn advance(&self, step: Duration) -> SimTime {
        self.now.add(step)
    }
}

impl SimClock for ManualClock {
    fn sim_time(&self) -> SimTime {
        self.now.load()
    }
}

#[derive(Debug, Default)]
struct Recorded {
    topics: Vec<String>,
    readings: Vec<IlluminanceReading>,
    images: Vec<CameraImage>,
    infos: Vec<CameraInfo>,
}

#[derive(Debug)]
struct RuntimeShared {
    initialized: AtomicBool,
    reading_subscribers: AtomicUsize,
    image_subscribers: AtomicUsize,
    wall_clock: AtomicF64,
    recorded: Mutex<Recorded>,
}

/// 记录型消息运行时
///
/// 订阅者数量由测试直接设置，所有发布内容按顺序保存。
#[derive(Debug, Clone)]
pub struct RecordingRuntime {
    shared: Arc<RuntimeShared>,
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRuntime {
    /// 已初始化、无订阅者
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                initialized: AtomicBool::new(true),
                reading_subscribers: AtomicUsize::new(0),
                image_subscribers: AtomicUsize::new(0),
                wall_clock: AtomicF64::new(0.0),
                recorded: Mutex::new(Recorded::default()),
            }),
        }
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.shared.initialized.store(initialized, Ordering::Release);
    }

    pub fn set_reading_subscribers(&self, count: usize) {
        self.shared.reading_subscribers.store(count, Ordering::Release);
    }

    pub fn set_image_subscribers(&self, count: usize) {
        self.shared.image_subscribers.store(count, Ordering::Release);
    }

    /// 设置 `now()` 返回的墙钟时间 (秒)
    pub fn set_wall_clock(&self, secs: f64) {
        self.shared.wall_clock.store(secs);
    }

    pub fn advertised_topics(&self) -> Vec<String> {
        lock(&self.shared.recorded).topics.clone()
    }

    pub fn readings(&self) -> Vec<IlluminanceReading> {
        lock(&self.shared.recorded).readings.clone()
    }

    pub fn images(&self) -> Vec<CameraImage> {
        lock(&self.shared.recorded).images.clone()
    }

    pub fn infos(&self) -> Vec<CameraInfo> {
        lock(&self.shared.recorded).infos.clone()
    }
}

impl MessagingRuntime for RecordingRuntime {
    fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    fn now(&self) -> Stamp {
        Stamp::from_secs_f64(self.shared.wall_clock.load())
    }

    fn advertise_readings(
        &self,
        topic: &str,
        _queue_size: usize,
    ) -> Result<Box<dyn ReadingPublisher>, ContractError> {
        if topic.is_empty() {
            return Err(ContractError::advertise(topic, "empty topic name"));
        }
        lock(&self.shared.recorded).topics.push(topic.to_string());
        Ok(Box::new(RecordingReadingPublisher {
            topic: topic.to_string(),
            shared: self.shared.clone(),
        }))
    }

    fn advertise_camera(
        &self,
        image_topic: &str,
        info_topic: &str,
    ) -> Result<Box<dyn CameraPublisher>, ContractError> {
        let mut recorded = lock(&self.shared.recorded);
        recorded.topics.push(image_topic.to_string());
        recorded.topics.push(info_topic.to_string());
        Ok(Box::new(RecordingCameraPublisher {
            shared: self.shared.clone(),
        }))
    }
}

struct RecordingReadingPublisher {
    topic: String,
    shared: Arc<RuntimeShared>,
}

impl ReadingPublisher for RecordingReadingPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn subscriber_count(&self) -> usize {
        self.shared.reading_subscribers.load(Ordering::Acquire)
    }

    fn publish(&self, reading: IlluminanceReading) {
        lock(&self.shared.recorded).readings.push(reading);
    }
}

struct RecordingCameraPublisher {
    shared: Arc<RuntimeShared>,
}

impl CameraPublisher for RecordingCameraPublisher {
    fn connection_count(&self) -> usize {
        self.shared.image_subscribers.load(Ordering::Acquire)
    }

    fn publish_image(&self, image: CameraImage) {
        lock(&self.shared.recorded).images.push(image);
    }

    fn publish_info(&self, info: CameraInfo) {
        lock(&self.shared.recorded).infos.push(info);
    }
}
