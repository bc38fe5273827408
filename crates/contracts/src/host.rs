//! Host capabilities - consumed by the plugin
//!
//! The simulator owns world stepping, rendering, sensor activation and the
//! messaging transport. The plugin reaches all of it through these traits,
//! so a fake host can drive the plugin in tests.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{CameraGeometry, CameraImage, CameraInfo, ContractError, IlluminanceReading, Stamp};

/// Simulator time since world start
///
/// Integer nanoseconds, so sums of frame steps compare exactly against the
/// publish period.
pub type SimTime = Duration;

/// Parent camera sensor
pub trait CameraSensor: Send + Sync {
    /// Sensor name
    fn name(&self) -> &str;

    /// Whether the sensor is currently rendering for consumers
    fn is_active(&self) -> bool;

    /// Activate or deactivate the sensor
    fn set_active(&self, active: bool);

    /// Simulator time of the last sensor update
    fn last_update_time(&self) -> SimTime;

    /// Image geometry
    fn geometry(&self) -> CameraGeometry;
}

/// Simulator world clock
pub trait SimClock: Send + Sync {
    /// Current simulator time
    fn sim_time(&self) -> SimTime;
}

/// Messaging runtime provided by the host
pub trait MessagingRuntime: Send + Sync {
    /// Whether the runtime has been started
    fn is_initialized(&self) -> bool;

    /// Current wall-clock time
    fn now(&self) -> Stamp;

    /// Advertise an illuminance topic
    fn advertise_readings(
        &self,
        topic: &str,
        queue_size: usize,
    ) -> Result<Box<dyn ReadingPublisher>, ContractError>;

    /// Advertise the camera image and camera info topics
    fn advertise_camera(
        &self,
        image_topic: &str,
        info_topic: &str,
    ) -> Result<Box<dyn CameraPublisher>, ContractError>;
}

/// Outbound illuminance endpoint
///
/// Publishing is fire-and-forget: the plugin never waits for delivery.
pub trait ReadingPublisher: Send {
    /// Resolved topic name
    fn topic(&self) -> &str;

    /// Current number of subscribers
    fn subscriber_count(&self) -> usize;

    /// Publish a reading
    fn publish(&self, reading: IlluminanceReading);
}

/// Camera side channel
pub trait CameraPublisher: Send {
    /// Current number of image subscribers
    fn connection_count(&self) -> usize;

    /// Forward raw image data
    fn publish_image(&self, image: CameraImage);

    /// Forward camera metadata
    fn publish_info(&self, info: CameraInfo);
}

/// Everything the host hands to the plugin at load time
#[derive(Clone)]
pub struct SensorHandle {
    pub sensor: Arc<dyn CameraSensor>,
    pub clock: Arc<dyn SimClock>,
    pub runtime: Arc<dyn MessagingRuntime>,
}

impl SensorHandle {
    pub fn new(
        sensor: Arc<dyn CameraSensor>,
        clock: Arc<dyn SimClock>,
        runtime: Arc<dyn MessagingRuntime>,
    ) -> Self {
        Self {
            sensor,
            clock,
            runtime,
        }
    }
}

impl fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorHandle")
            .field("sensor", &self.sensor.name())
            .field("runtime_initialized", &self.runtime.is_initialized())
            .finish()
    }
}
