//! Simulation orchestrator - wires the simulated host around the plugin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bus::LocalBus;
use contracts::{CameraSensor, Lifecycle, SceneConfig, SensorHandle};
use light_sensor::{FrameDriver, FramePattern, LightSensorPlugin, ManualClock, MockCamera};
use tracing::{debug, info, warn};

use super::RunStats;

/// How long to wait for sinks to drain after the bus closes
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// The validated scene
    pub scene: SceneConfig,

    /// Frames to render (None = until stopped)
    pub frames: Option<u64>,

    /// Frame content
    pub pattern: FramePattern,

    /// Pace frames in wall-clock time
    pub realtime: bool,

    /// Per-topic bus buffer
    pub topic_capacity: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main simulation orchestrator
pub struct Simulation {
    config: SimulationConfig,
    stop: Arc<AtomicBool>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the frame loop after the current frame
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run the simulation to completion
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();
        let scene = &self.config.scene;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Host
        let bus = LocalBus::new(self.config.topic_capacity);
        let camera = Arc::new(MockCamera::new(&scene.sensor.name, scene.geometry()));
        let clock = Arc::new(ManualClock::default());
        if scene.sensor.always_on {
            camera.set_active(true);
        }

        // Plugin
        let mut plugin = LightSensorPlugin::new();
        plugin
            .on_load(
                SensorHandle::new(camera.clone(), clock.clone(), Arc::new(bus.clone())),
                &scene.plugin,
            )
            .context("Failed to load light sensor plugin")?;

        let reading_topic = plugin
            .reading_topic()
            .context("Plugin loaded without a reading topic")?
            .to_string();

        // Sinks
        let dispatcher_handle = if scene.sinks.is_empty() {
            warn!("No sinks configured - readings will not be consumed");
            None
        } else {
            let rx = bus
                .subscribe_readings(&reading_topic)
                .context("Failed to subscribe to reading topic")?;
            let dispatcher = bus::create_dispatcher(scene.sinks.clone(), rx)
                .context("Failed to create dispatcher")?;
            Some(dispatcher.spawn())
        };
        let active_sinks = scene.sinks.len();
        info!(active_sinks, topic = %reading_topic, "Dispatcher started");

        // Frame loop
        let mut driver = FrameDriver::new(
            camera.clone(),
            clock.clone(),
            scene.sensor.update_rate,
            &self.config.pattern,
        )
        .context("Failed to prepare frames")?;

        let mut stats = RunStats {
            active_sinks,
            ..Default::default()
        };

        let mut pacer = self.config.realtime.then(|| {
            let mut interval = tokio::time::interval(driver.step().max(Duration::from_nanos(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval
        });

        info!(
            frames = ?self.config.frames,
            step = ?driver.step(),
            realtime = self.config.realtime,
            "Simulation running"
        );

        loop {
            if self.stop.load(Ordering::Acquire) {
                stats.interrupted = true;
                break;
            }
            if let Some(max) = self.config.frames {
                if driver.delivered() >= max {
                    break;
                }
            }

            match pacer.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => tokio::task::yield_now().await,
            }

            let outcome = driver.tick(&mut plugin);
            stats.readings.record_outcome(outcome.label());
            if let Some(reading) = outcome.reading() {
                stats.readings.record_reading(reading);
                debug!(
                    seq = reading.seq(),
                    illuminance = reading.illuminance,
                    "Reading published"
                );
            }
        }

        // Shutdown
        info!("Shutting down simulation...");
        stats.frames_delivered = driver.delivered();
        stats.sim_time = driver.now().as_secs_f64();
        stats.plugin = plugin.metrics().snapshot();

        plugin.on_unload();
        bus.shutdown();

        if let Some(handle) = dispatcher_handle {
            match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
                Ok(Ok(report)) => stats.dispatch = Some(report),
                Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
                Err(_) => warn!("Timed out waiting for sinks to drain"),
            }
        }

        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Simulation shutdown complete"
        );

        Ok(stats)
    }
}
