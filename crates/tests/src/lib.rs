//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载到插件加载的完整路径
//! - 模拟 e2e 测试：相机帧 -> 插件 -> LocalBus -> Dispatcher -> sinks

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use bus::{create_dispatcher, LocalBus};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CameraGeometry, CameraSensor, FrameSink, IlluminanceReading, Lifecycle,
        LightSensorConfig, PixelFormat, SensorHandle, SinkConfig, SinkType,
    };
    use light_sensor::{
        FrameDriver, FrameOutcome, FramePattern, LightSensorPlugin, ManualClock, MockCamera,
    };

    /// 64×48 灰度相机 + 16Hz 帧驱动
    struct Host {
        bus: LocalBus,
        camera: Arc<MockCamera>,
        clock: Arc<ManualClock>,
    }

    impl Host {
        fn new() -> Self {
            Self {
                bus: LocalBus::new(256),
                camera: Arc::new(MockCamera::new(
                    "light_cam",
                    CameraGeometry::new(64, 48, PixelFormat::L8),
                )),
                clock: Arc::new(ManualClock::default()),
            }
        }

        fn handle(&self) -> SensorHandle {
            SensorHandle::new(
                self.camera.clone(),
                self.clock.clone(),
                Arc::new(self.bus.clone()),
            )
        }

        fn driver(&self, pattern: FramePattern) -> FrameDriver {
            FrameDriver::new(self.camera.clone(), self.clock.clone(), 16.0, &pattern).unwrap()
        }
    }

    /// End-to-end test: FrameDriver -> LightSensorPlugin -> LocalBus -> Dispatcher -> FileSink
    ///
    /// 验证完整的数据流：
    /// 1. 第一个订阅者出现后，第一帧只激活传感器
    /// 2. 之后每帧发布一条读数，序号连续
    /// 3. 总线关闭后 Dispatcher 排空并写出全部读数
    #[tokio::test]
    async fn test_e2e_readings_reach_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("illuminance.jsonl");

        let host = Host::new();
        let mut plugin = LightSensorPlugin::new();
        plugin
            .on_load(host.handle(), &LightSensorConfig::default())
            .unwrap();
        let topic = plugin.reading_topic().unwrap().to_string();
        assert_eq!(topic, "lightSensor");

        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        let sinks = vec![
            SinkConfig {
                name: "console".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 50,
                params,
            },
        ];
        let rx = host.bus.subscribe_readings(&topic).unwrap();
        let dispatcher = create_dispatcher(sinks, rx).unwrap().spawn();

        let mut driver = host.driver(FramePattern::Uniform(100));
        let outcomes: Vec<FrameOutcome> = (0..20).map(|_| driver.tick(&mut plugin)).collect();

        assert!(matches!(outcomes[0], FrameOutcome::Activated));
        assert!(host.camera.is_active());
        assert!(outcomes[1..].iter().all(FrameOutcome::is_published));
        assert_eq!(plugin.sequence(), 19);

        host.bus.shutdown();
        let report = tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher)
            .await
            .expect("dispatcher timed out")
            .unwrap();
        assert_eq!(report.received, 19);
        assert_eq!(report.lagged, 0);
        assert!(report
            .sinks
            .iter()
            .all(|(_, m)| m.written == 19 && m.missed == 0));

        let content = std::fs::read_to_string(&path).unwrap();
        let readings: Vec<IlluminanceReading> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(readings.len(), 19);
        for (expected_seq, reading) in readings.iter().enumerate() {
            assert_eq!(reading.seq() as usize, expected_seq);
            assert_eq!(reading.illuminance, 100.0);
            assert_eq!(reading.variance, 0.0);
            assert!(reading.header.frame_id.is_empty());
        }
    }

    /// 图像订阅者也会激活传感器，相机数据随读数一起转发
    #[tokio::test]
    async fn test_image_subscriber_activates_sensor() {
        let host = Host::new();
        let mut plugin = LightSensorPlugin::new();
        plugin
            .on_load(host.handle(), &LightSensorConfig::default())
            .unwrap();

        let camera = plugin.camera().unwrap();
        let mut images = host.bus.subscribe_images(camera.image_topic()).unwrap();
        let mut infos = host
            .bus
            .subscribe_camera_info(camera.info_topic())
            .unwrap();

        let mut driver = host.driver(FramePattern::HorizontalGradient);
        assert!(matches!(driver.tick(&mut plugin), FrameOutcome::Activated));
        assert!(driver.tick(&mut plugin).is_published());

        let image = images.recv().await.unwrap();
        assert_eq!(image.width, 64);
        assert_eq!(image.height, 48);
        assert_eq!(image.step, 64);
        assert_eq!(image.encoding, "mono8");
        assert_eq!(image.data.len(), 64 * 48);
        assert_eq!(image.header.frame_id, "/world");

        let info = infos.recv().await.unwrap();
        assert_eq!((info.width, info.height), (64, 48));
        assert_eq!(info.header.stamp, image.header.stamp);
    }

    /// 订阅者离开后传感器保持激活但不再发布，序号不前进
    #[tokio::test]
    async fn test_subscriber_leaves() {
        let host = Host::new();
        let mut plugin = LightSensorPlugin::new();
        plugin
            .on_load(host.handle(), &LightSensorConfig::default())
            .unwrap();

        let rx = host.bus.subscribe_readings("lightSensor").unwrap();
        let mut driver = host.driver(FramePattern::default());
        for _ in 0..4 {
            driver.tick(&mut plugin);
        }
        assert_eq!(plugin.sequence(), 3);

        drop(rx);
        for _ in 0..4 {
            assert!(matches!(
                driver.tick(&mut plugin),
                FrameOutcome::NoSubscribers
            ));
        }
        assert!(host.camera.is_active());
        assert_eq!(plugin.sequence(), 3);
    }

    /// 宿主直接回调 `on_new_frame` 的路径
    #[tokio::test]
    async fn test_raw_frame_callback() {
        let host = Host::new();
        host.camera.set_active(true);

        let mut plugin = LightSensorPlugin::new();
        plugin
            .on_load(host.handle(), &LightSensorConfig::default())
            .unwrap();
        let mut rx = host.bus.subscribe_readings("lightSensor").unwrap();

        // 窗口外的像素不影响读数
        let mut pixels = vec![255u8; 64 * 48];
        let window = contracts::SamplingWindow::locate(
            6,
            contracts::WindowOrigin::Reference,
            64,
            48,
            pixels.len(),
        )
        .unwrap();
        for idx in window.indices() {
            pixels[idx] = 40;
        }

        host.clock.advance(std::time::Duration::from_millis(100));
        plugin.on_new_frame(&pixels, 64, 48, 1, "L8");

        let reading = rx.recv().await.unwrap();
        assert_eq!(reading.seq(), 0);
        assert_eq!(reading.illuminance, 40.0);
    }

    /// 总线未启动时插件拒绝加载，也不宣告任何话题
    #[test]
    fn test_load_requires_running_bus() {
        let host = Host::new();
        let bus = LocalBus::uninitialized(8);
        let handle = SensorHandle::new(
            host.camera.clone(),
            host.clock.clone(),
            Arc::new(bus.clone()),
        );

        let mut plugin = LightSensorPlugin::new();
        let err = plugin
            .on_load(handle, &LightSensorConfig::default())
            .unwrap_err();
        assert!(matches!(err, contracts::ContractError::RuntimeNotInitialized { .. }));
        assert!(!plugin.is_loaded());
        assert!(bus.topics().is_empty());
    }

    /// 从 TOML 场景加载配置，按命名空间宣告话题并节流发布
    #[tokio::test]
    async fn test_scene_config_drives_plugin() {
        let scene = ConfigLoader::load_from_str(
            r#"
[sensor]
name = "light_cam"
update_rate = 16.0
always_on = true

[sensor.image]
width = 64
height = 48
format = "L8"

[plugin]
robot_namespace = "rover"
fov = 6
update_rate = 4.0
window_origin = "centered"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let bus = LocalBus::new(64);
        let camera = Arc::new(MockCamera::new(&scene.sensor.name, scene.geometry()));
        camera.set_active(scene.sensor.always_on);
        let clock = Arc::new(ManualClock::default());

        let mut plugin = LightSensorPlugin::new();
        plugin
            .on_load(
                SensorHandle::new(camera.clone(), clock.clone(), Arc::new(bus.clone())),
                &scene.plugin,
            )
            .unwrap();

        assert_eq!(
            bus.topics(),
            vec![
                "rover/lightSensor".to_string(),
                "rover/light_cam/camera_info".to_string(),
                "rover/light_cam/image_raw".to_string(),
            ]
        );

        let mut rx = bus.subscribe_readings("rover/lightSensor").unwrap();
        let mut driver = FrameDriver::new(
            camera,
            clock,
            scene.sensor.update_rate,
            &FramePattern::Uniform(100),
        )
        .unwrap();

        // 16Hz 渲染 2 秒，4Hz 发布
        let published = (0..32)
            .filter(|_| driver.tick(&mut plugin).is_published())
            .count();
        assert_eq!(published, 8);

        for seq in 0..8 {
            let reading = rx.recv().await.unwrap();
            assert_eq!(reading.seq(), seq);
            assert_eq!(reading.illuminance, 100.0);
        }

        plugin.on_unload();
        assert!(matches!(
            driver.tick(&mut plugin),
            FrameOutcome::NotLoaded
        ));
    }
}
