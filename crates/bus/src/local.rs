//! LocalBus - 进程内消息总线
//!
//! 每个话题一个 `broadcast` 通道。订阅者数量即接收端数量；
//! 发布端每次发布时按话题名查找发送端，`shutdown` 之后所有话题关闭。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use contracts::{
    CameraImage, CameraInfo, CameraPublisher, ContractError, IlluminanceReading,
    MessagingRuntime, ReadingPublisher, Stamp,
};

use crate::error::BusError;

/// 默认每话题缓冲长度
pub const DEFAULT_TOPIC_CAPACITY: usize = 64;

#[derive(Default)]
struct Topics {
    readings: HashMap<String, broadcast::Sender<IlluminanceReading>>,
    images: HashMap<String, broadcast::Sender<CameraImage>>,
    infos: HashMap<String, broadcast::Sender<CameraInfo>>,
}

struct BusInner {
    initialized: AtomicBool,
    closed: AtomicBool,
    capacity: usize,
    topics: RwLock<Topics>,
}

impl BusInner {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Topics> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Topics> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 从话题表中取出或创建发送端
fn sender_for<T: Clone>(
    map: &mut HashMap<String, broadcast::Sender<T>>,
    topic: &str,
    capacity: usize,
) -> broadcast::Sender<T> {
    map.entry(topic.to_string())
        .or_insert_with(|| broadcast::channel(capacity).0)
        .clone()
}

fn receiver_count<T>(map: &HashMap<String, broadcast::Sender<T>>, topic: &str) -> usize {
    map.get(topic).map_or(0, |tx| tx.receiver_count())
}

/// 进程内消息总线
///
/// 可廉价克隆，所有克隆共享同一组话题。
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl LocalBus {
    /// 创建已启动的总线
    pub fn new(capacity: usize) -> Self {
        let bus = Self::uninitialized(capacity);
        bus.start();
        bus
    }

    /// 创建尚未启动的总线，需调用 [`start`](Self::start)
    pub fn uninitialized(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                initialized: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                capacity: capacity.max(1),
                topics: RwLock::new(Topics::default()),
            }),
        }
    }

    /// 启动总线
    pub fn start(&self) {
        if !self.inner.initialized.swap(true, Ordering::AcqRel) {
            debug!(capacity = self.inner.capacity, "local bus started");
        }
    }

    /// 每话题缓冲长度
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// 订阅照度话题
    pub fn subscribe_readings(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<IlluminanceReading>, BusError> {
        self.ensure_open()?;
        let mut topics = self.inner.write();
        Ok(sender_for(&mut topics.readings, topic, self.inner.capacity).subscribe())
    }

    /// 订阅图像话题
    pub fn subscribe_images(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<CameraImage>, BusError> {
        self.ensure_open()?;
        let mut topics = self.inner.write();
        Ok(sender_for(&mut topics.images, topic, self.inner.capacity).subscribe())
    }

    /// 订阅相机信息话题
    pub fn subscribe_camera_info(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<CameraInfo>, BusError> {
        self.ensure_open()?;
        let mut topics = self.inner.write();
        Ok(sender_for(&mut topics.infos, topic, self.inner.capacity).subscribe())
    }

    /// 所有已知话题，按名称排序
    pub fn topics(&self) -> Vec<String> {
        let topics = self.inner.read();
        let mut names: Vec<String> = topics
            .readings
            .keys()
            .chain(topics.images.keys())
            .chain(topics.infos.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// 照度话题的订阅者数量
    pub fn reading_subscribers(&self, topic: &str) -> usize {
        receiver_count(&self.inner.read().readings, topic)
    }

    /// 关闭所有话题
    ///
    /// 丢弃全部发送端，订阅者随后收到 `Closed`。
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut topics = self.inner.write();
        let count = topics.readings.len() + topics.images.len() + topics.infos.len();
        *topics = Topics::default();
        info!(topics = count, "local bus shut down");
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.is_closed() {
            Err(BusError::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus")
            .field("initialized", &self.inner.initialized.load(Ordering::Relaxed))
            .field("closed", &self.is_closed())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

impl MessagingRuntime for LocalBus {
    fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire) && !self.is_closed()
    }

    fn now(&self) -> Stamp {
        let now = Utc::now();
        Stamp {
            sec: now.timestamp(),
            nsec: now.timestamp_subsec_nanos(),
        }
    }

    fn advertise_readings(
        &self,
        topic: &str,
        queue_size: usize,
    ) -> Result<Box<dyn ReadingPublisher>, ContractError> {
        if topic.is_empty() {
            return Err(ContractError::advertise(topic, "topic name cannot be empty"));
        }
        if self.is_closed() {
            return Err(ContractError::advertise(topic, "bus is shut down"));
        }

        sender_for(&mut self.inner.write().readings, topic, self.inner.capacity);
        debug!(topic, queue_size, "reading topic advertised");

        Ok(Box::new(LocalReadingPublisher {
            topic: topic.to_string(),
            inner: self.inner.clone(),
        }))
    }

    fn advertise_camera(
        &self,
        image_topic: &str,
        info_topic: &str,
    ) -> Result<Box<dyn CameraPublisher>, ContractError> {
        for topic in [image_topic, info_topic] {
            if topic.is_empty() {
                return Err(ContractError::advertise(topic, "topic name cannot be empty"));
            }
        }
        if self.is_closed() {
            return Err(ContractError::advertise(image_topic, "bus is shut down"));
        }

        {
            let mut topics = self.inner.write();
            sender_for(&mut topics.images, image_topic, self.inner.capacity);
            sender_for(&mut topics.infos, info_topic, self.inner.capacity);
        }
        debug!(image_topic, info_topic, "camera topics advertised");

        Ok(Box::new(LocalCameraPublisher {
            image_topic: image_topic.to_string(),
            info_topic: info_topic.to_string(),
            inner: self.inner.clone(),
        }))
    }
}

struct LocalReadingPublisher {
    topic: String,
    inner: Arc<BusInner>,
}

impl ReadingPublisher for LocalReadingPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn subscriber_count(&self) -> usize {
        receiver_count(&self.inner.read().readings, &self.topic)
    }

    fn publish(&self, reading: IlluminanceReading) {
        let topics = self.inner.read();
        let Some(tx) = topics.readings.get(&self.topic) else {
            trace!(topic = %self.topic, "topic closed, reading discarded");
            return;
        };
        if tx.send(reading).is_err() {
            trace!(topic = %self.topic, "no subscribers, reading discarded");
        }
    }
}

struct LocalCameraPublisher {
    image_topic: String,
    info_topic: String,
    inner: Arc<BusInner>,
}

impl CameraPublisher for LocalCameraPublisher {
    fn connection_count(&self) -> usize {
        receiver_count(&self.inner.read().images, &self.image_topic)
    }

    fn publish_image(&self, image: CameraImage) {
        let topics = self.inner.read();
        if let Some(tx) = topics.images.get(&self.image_topic) {
            // 没有订阅者时直接丢弃
            let _ = tx.send(image);
        }
    }

    fn publish_info(&self, info: CameraInfo) {
        let topics = self.inner.read();
        if let Some(tx) = topics.infos.get(&self.info_topic) {
            let _ = tx.send(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_until_started() {
        let bus = LocalBus::uninitialized(8);
        assert!(!bus.is_initialized());
        bus.start();
        assert!(bus.is_initialized());
    }

    #[tokio::test]
    async fn test_subscriber_counts_and_delivery() {
        let bus = LocalBus::new(8);
        let publisher = bus.advertise_readings("lightSensor", 1).unwrap();
        assert_eq!(publisher.subscriber_count(), 0);

        // 无订阅者时发布不会失败
        publisher.publish(IlluminanceReading::new(0, bus.now(), 1.0));

        let mut rx = bus.subscribe_readings("lightSensor").unwrap();
        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(bus.reading_subscribers("lightSensor"), 1);

        publisher.publish(IlluminanceReading::new(1, bus.now(), 2.0));
        let reading = rx.recv().await.unwrap();
        assert_eq!(reading.seq(), 1);
        assert_eq!(reading.illuminance, 2.0);

        drop(rx);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_camera_connection_count() {
        let bus = LocalBus::new(8);
        let publisher = bus.advertise_camera("cam/image_raw", "cam/camera_info").unwrap();
        assert_eq!(publisher.connection_count(), 0);

        let _images = bus.subscribe_images("cam/image_raw").unwrap();
        let mut infos = bus.subscribe_camera_info("cam/camera_info").unwrap();
        assert_eq!(publisher.connection_count(), 1);

        publisher.publish_info(CameraInfo {
            header: Default::default(),
            width: 4,
            height: 3,
        });
        assert_eq!(infos.recv().await.unwrap().width, 4);
        assert_eq!(
            bus.topics(),
            vec!["cam/camera_info".to_string(), "cam/image_raw".to_string()]
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers() {
        let bus = LocalBus::new(8);
        let publisher = bus.advertise_readings("lightSensor", 1).unwrap();
        let mut rx = bus.subscribe_readings("lightSensor").unwrap();

        bus.shutdown();
        assert!(!bus.is_initialized());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));

        // 关闭后发布被丢弃
        publisher.publish(IlluminanceReading::new(0, bus.now(), 1.0));
        assert_eq!(publisher.subscriber_count(), 0);
        assert!(bus.subscribe_readings("lightSensor").is_err());
        assert!(bus.advertise_readings("other", 1).is_err());
    }

    #[test]
    fn test_empty_topic_rejected() {
        let bus = LocalBus::default();
        assert!(bus.advertise_readings("", 1).is_err());
    }
}
