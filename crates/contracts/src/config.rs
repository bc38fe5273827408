//! SceneConfig - Config Loader 输出
//!
//! 描述宿主场景中的相机传感器、挂载的光照传感器插件以及读数输出路由。

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{CameraGeometry, PixelFormat};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的场景配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SceneConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 宿主相机传感器
    #[validate(nested)]
    pub sensor: CameraSensorConfig,

    /// 光照传感器插件参数
    #[serde(default)]
    #[validate(nested)]
    pub plugin: LightSensorConfig,

    /// 读数输出路由
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl SceneConfig {
    /// 相机几何参数
    pub fn geometry(&self) -> CameraGeometry {
        CameraGeometry::new(
            self.sensor.image.width,
            self.sensor.image.height,
            self.sensor.image.format,
        )
    }
}

/// 宿主相机传感器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CameraSensorConfig {
    /// 传感器名称
    #[validate(length(min = 1, message = "sensor name cannot be empty"))]
    pub name: String,

    /// 渲染频率 (Hz)
    #[serde(default = "default_sensor_update_rate")]
    #[validate(range(min = 0.0, message = "sensor update_rate must be >= 0"))]
    pub update_rate: f64,

    /// 是否在没有订阅者时保持激活
    #[serde(default)]
    pub always_on: bool,

    /// 图像参数
    #[validate(nested)]
    pub image: ImageConfig,
}

fn default_sensor_update_rate() -> f64 {
    30.0
}

/// 图像参数
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImageConfig {
    /// 宽度 (像素)
    #[validate(range(min = 1, message = "image width must be >= 1"))]
    pub width: u32,

    /// 高度 (像素)
    #[validate(range(min = 1, message = "image height must be >= 1"))]
    pub height: u32,

    /// 像素格式
    #[serde(default = "default_pixel_format")]
    pub format: PixelFormat,
}

fn default_pixel_format() -> PixelFormat {
    PixelFormat::L8
}

/// 采样窗口定位方式
///
/// `Reference` 的起点为 `W * (H/2 - fov/2) - fov/2`，
/// 列偏移只有 `-fov/2`，窗口实际落在行首附近并跨越上一行行尾。
/// `Centered` 把窗口放在 `(H/2 - fov/2, W/2 - fov/2)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOrigin {
    #[default]
    Reference,
    Centered,
}

/// 光照传感器插件配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LightSensorConfig {
    /// 话题命名空间
    pub robot_namespace: String,

    /// 读数话题
    #[validate(length(min = 1, message = "topic_name cannot be empty"))]
    pub topic_name: String,

    /// 采样窗口边长 (像素数，不是角度)
    #[validate(range(min = 1, message = "fov must be >= 1"))]
    pub fov: u32,

    /// 探测距离 (当前未参与计算)
    #[validate(range(min = 0.0, message = "range must be >= 0"))]
    pub range: f64,

    /// 发布频率 (Hz)，0 表示每帧发布
    #[validate(range(min = 0.0, message = "update_rate must be >= 0"))]
    pub update_rate: f64,

    /// 相机名称
    pub camera_name: String,

    /// 图像话题
    #[validate(length(min = 1, message = "image_topic_name cannot be empty"))]
    pub image_topic_name: String,

    /// 相机信息话题
    #[validate(length(min = 1, message = "camera_info_topic_name cannot be empty"))]
    pub camera_info_topic_name: String,

    /// 坐标系名称
    pub frame_name: String,

    /// 窗口定位方式
    pub window_origin: WindowOrigin,
}

impl Default for LightSensorConfig {
    fn default() -> Self {
        Self {
            robot_namespace: String::new(),
            topic_name: "lightSensor".to_string(),
            fov: 6,
            range: 10.0,
            update_rate: 0.0,
            camera_name: String::new(),
            image_topic_name: "image_raw".to_string(),
            camera_info_topic_name: "camera_info".to_string(),
            frame_name: "/world".to_string(),
            window_origin: WindowOrigin::Reference,
        }
    }
}

impl LightSensorConfig {
    /// 最小发布间隔 (仿真时间)
    ///
    /// 频率为 0 时不限速；频率极小导致周期溢出时取 `Duration::MAX`。
    pub fn update_period(&self) -> Duration {
        if self.update_rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.update_rate).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// JSON Lines 文件输出
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_defaults() {
        let config = LightSensorConfig::default();
        assert_eq!(config.topic_name, "lightSensor");
        assert_eq!(config.fov, 6);
        assert_eq!(config.range, 10.0);
        assert_eq!(config.window_origin, WindowOrigin::Reference);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_update_period() {
        let mut config = LightSensorConfig::default();
        assert_eq!(config.update_period(), Duration::ZERO);
        config.update_rate = 4.0;
        assert_eq!(config.update_period(), Duration::from_millis(250));
        config.update_rate = 30.0;
        assert_eq!(config.update_period().as_nanos(), 33_333_333);
        config.update_rate = 1e-300;
        assert_eq!(config.update_period(), Duration::MAX);
    }

    #[test]
    fn test_zero_fov_fails_validation() {
        let config = LightSensorConfig {
            fov: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("fov"));
    }

    #[test]
    fn test_plugin_partial_json_uses_defaults() {
        let config: LightSensorConfig = serde_json::from_str(r#"{ "fov": 4 }"#).unwrap();
        assert_eq!(config.fov, 4);
        assert_eq!(config.topic_name, "lightSensor");
        assert_eq!(config.image_topic_name, "image_raw");
    }
}
