//! CameraContext - 加载时建立的相机上下文
//!
//! 保存几何参数、话题名与相机旁路发布端，按帧把原始图像和相机信息转发出去。

use std::time::Duration;

use bytes::Bytes;
use contracts::{
    CameraGeometry, CameraImage, CameraInfo, CameraPublisher, ContractError, Header,
    LightSensorConfig, MessagingRuntime, SimTime, Stamp,
};
use tracing::trace;

/// 相机上下文
pub struct CameraContext {
    camera_name: String,
    frame_name: String,
    image_topic: String,
    info_topic: String,
    geometry: CameraGeometry,
    update_period: Duration,
    sensor_update_time: SimTime,
    publisher: Box<dyn CameraPublisher>,
}

impl CameraContext {
    /// 根据几何参数和插件配置建立上下文并宣告相机话题
    pub fn advertise(
        runtime: &dyn MessagingRuntime,
        geometry: CameraGeometry,
        sensor_name: &str,
        config: &LightSensorConfig,
    ) -> Result<Self, ContractError> {
        let camera_name = if config.camera_name.is_empty() {
            sensor_name.to_string()
        } else {
            config.camera_name.clone()
        };

        let prefix = scoped_topic(&config.robot_namespace, &camera_name);
        let image_topic = scoped_topic(&prefix, &config.image_topic_name);
        let info_topic = scoped_topic(&prefix, &config.camera_info_topic_name);
        let publisher = runtime.advertise_camera(&image_topic, &info_topic)?;

        Ok(Self {
            camera_name,
            frame_name: config.frame_name.clone(),
            image_topic,
            info_topic,
            geometry,
            update_period: config.update_period(),
            sensor_update_time: SimTime::ZERO,
            publisher,
        })
    }

    pub fn camera_name(&self) -> &str {
        &self.camera_name
    }

    pub fn frame_name(&self) -> &str {
        &self.frame_name
    }

    pub fn image_topic(&self) -> &str {
        &self.image_topic
    }

    pub fn info_topic(&self) -> &str {
        &self.info_topic
    }

    pub fn geometry(&self) -> CameraGeometry {
        self.geometry
    }

    pub fn update_period(&self) -> Duration {
        self.update_period
    }

    /// 最近一次传感器更新的仿真时间
    pub fn sensor_update_time(&self) -> SimTime {
        self.sensor_update_time
    }

    pub fn set_sensor_update_time(&mut self, time: SimTime) {
        self.sensor_update_time = time;
    }

    /// 图像话题订阅者数量
    pub fn connection_count(&self) -> usize {
        self.publisher.connection_count()
    }

    /// 转发原始图像
    pub fn put_camera_data(&self, data: &[u8]) {
        let geometry = self.geometry;
        let image = CameraImage {
            header: self.header(),
            width: geometry.width,
            height: geometry.height,
            encoding: geometry.format.encoding().to_string(),
            step: geometry.step(),
            data: Bytes::copy_from_slice(data),
        };
        trace!(topic = %self.image_topic, bytes = data.len(), "forward camera image");
        self.publisher.publish_image(image);
    }

    /// 转发相机信息
    pub fn publish_camera_info(&self) {
        let info = CameraInfo {
            header: self.header(),
            width: self.geometry.width,
            height: self.geometry.height,
        };
        self.publisher.publish_info(info);
    }

    fn header(&self) -> Header {
        Header {
            seq: 0,
            stamp: Stamp::from_duration(self.sensor_update_time),
            frame_id: self.frame_name.clone(),
        }
    }
}

impl std::fmt::Debug for CameraContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraContext")
            .field("camera_name", &self.camera_name)
            .field("image_topic", &self.image_topic)
            .field("info_topic", &self.info_topic)
            .field("geometry", &self.geometry)
            .field("update_period", &self.update_period)
            .finish()
    }
}

/// `scope/topic`，scope 为空时只用话题名
pub fn scoped_topic(scope: &str, topic: &str) -> String {
    let scope = scope.trim_matches('/');
    if scope.is_empty() {
        topic.to_string()
    } else if topic.is_empty() {
        scope.to_string()
    } else {
        format!("{}/{}", scope, topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_topic() {
        assert_eq!(scoped_topic("cam", "image_raw"), "cam/image_raw");
        assert_eq!(scoped_topic("cam/", "camera_info"), "cam/camera_info");
        assert_eq!(scoped_topic("", "image_raw"), "image_raw");
        assert_eq!(scoped_topic("/robot/", "cam"), "robot/cam");
        assert_eq!(scoped_topic("robot", ""), "robot");
    }
}
