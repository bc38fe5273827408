//! # Light Sensor
//!
//! 把相机传感器变成光照传感器：每帧对画面中部一个 `fov × fov` 窗口求平均强度，
//! 按仿真时间节流后发布为照度读数。
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{Lifecycle, FrameSink, SensorHandle};
//! use light_sensor::LightSensorPlugin;
//!
//! let mut plugin = LightSensorPlugin::new();
//! plugin.on_load(SensorHandle::new(camera, clock, runtime), &config.plugin)?;
//!
//! // 宿主渲染回调
//! plugin.on_new_frame(&pixels, width, height, depth, "L8");
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use light_sensor::{FrameDriver, FramePattern, ManualClock, MockCamera, RecordingRuntime};
//!
//! let mut driver = FrameDriver::new(camera, clock, 30.0, &FramePattern::Uniform(100))?;
//! let outcome = driver.tick(&mut plugin);
//! ```

mod context;
mod driver;
mod metrics;
mod mock;
mod plugin;
mod reducer;
mod throttle;

// Re-exports
pub use context::{scoped_topic, CameraContext};
pub use driver::{FrameDriver, FramePattern};
pub use metrics::{MetricsSnapshot, PluginMetrics};
pub use mock::{ManualClock, MockCamera, RecordingRuntime};
pub use plugin::{FrameOutcome, LightSensorPlugin, SensorState};
pub use reducer::FrameReducer;
pub use throttle::Throttle;
