//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{SamplingWindow, SceneConfig};
use light_sensor::scoped_topic;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    camera: CameraInfo,
    light_sensor: LightSensorInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct CameraInfo {
    name: String,
    width: u32,
    height: u32,
    format: String,
    depth: u32,
    frame_bytes: usize,
    update_rate_hz: f64,
    always_on: bool,
}

#[derive(Serialize)]
struct LightSensorInfo {
    fov: u32,
    window_origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_start: Option<usize>,
    update_rate_hz: f64,
    range: f64,
    reading_topic: String,
    image_topic: String,
    camera_info_topic: String,
    frame_name: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let scene = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&scene, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(scene: &SceneConfig, args: &InfoArgs) -> ConfigInfo {
    let geometry = scene.geometry();
    let plugin = &scene.plugin;

    let window_start = SamplingWindow::locate(
        plugin.fov,
        plugin.window_origin,
        geometry.width,
        geometry.height,
        geometry.frame_len(),
    )
    .ok()
    .map(|window| window.start());

    let camera_name = if plugin.camera_name.is_empty() {
        scene.sensor.name.as_str()
    } else {
        plugin.camera_name.as_str()
    };
    let camera_scope = scoped_topic(&plugin.robot_namespace, camera_name);

    let sinks = if args.sinks {
        scene
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", scene.version),
        camera: CameraInfo {
            name: scene.sensor.name.clone(),
            width: geometry.width,
            height: geometry.height,
            format: geometry.format.as_str().to_string(),
            depth: geometry.depth,
            frame_bytes: geometry.frame_len(),
            update_rate_hz: scene.sensor.update_rate,
            always_on: scene.sensor.always_on,
        },
        light_sensor: LightSensorInfo {
            fov: plugin.fov,
            window_origin: format!("{:?}", plugin.window_origin),
            window_start,
            update_rate_hz: plugin.update_rate,
            range: plugin.range,
            reading_topic: scoped_topic(&plugin.robot_namespace, &plugin.topic_name),
            image_topic: scoped_topic(&camera_scope, &plugin.image_topic_name),
            camera_info_topic: scoped_topic(&camera_scope, &plugin.camera_info_topic_name),
            frame_name: plugin.frame_name.clone(),
        },
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Light Sensor Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let camera = &info.camera;
    println!("📷 Camera");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Name: {}", camera.name);
    println!(
        "   ├─ Image: {}x{} {} ({} bytes/frame)",
        camera.width, camera.height, camera.format, camera.frame_bytes
    );
    println!("   ├─ Render Rate: {} Hz", camera.update_rate_hz);
    println!("   └─ Always On: {}", camera.always_on);

    let sensor = &info.light_sensor;
    println!("\n💡 Light Sensor");
    println!(
        "   ├─ Window: {}x{} ({})",
        sensor.fov, sensor.fov, sensor.window_origin
    );
    match sensor.window_start {
        Some(start) => println!("   ├─ First Sample: {}", start),
        None => println!("   ├─ First Sample: (outside frame)"),
    }
    if sensor.update_rate_hz > 0.0 {
        println!("   ├─ Publish Rate: {} Hz", sensor.update_rate_hz);
    } else {
        println!("   ├─ Publish Rate: every frame");
    }
    println!("   ├─ Range: {}", sensor.range);
    println!("   ├─ Reading Topic: {}", sensor.reading_topic);
    println!("   ├─ Image Topic: {}", sensor.image_topic);
    println!("   ├─ Camera Info Topic: {}", sensor.camera_info_topic);
    println!("   └─ Frame: {}", sensor.frame_name);

    if !info.sinks.is_empty() {
        println!("\n📤 Sinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let is_last = i == info.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};
    use std::path::PathBuf;

    const SCENE: &str = r#"
[sensor]
name = "light_cam"

[sensor.image]
width = 64
height = 48

[plugin]
robot_namespace = "/rover/"
fov = 4

[[sinks]]
name = "console"
sink_type = "log"
"#;

    fn args(sinks: bool) -> InfoArgs {
        InfoArgs {
            config: PathBuf::from("scene.toml"),
            json: true,
            sinks,
        }
    }

    #[test]
    fn test_build_config_info() {
        let scene = ConfigLoader::load_from_str(SCENE, ConfigFormat::Toml).unwrap();
        let info = build_config_info(&scene, &args(true));

        assert_eq!(info.camera.frame_bytes, 64 * 48);
        assert_eq!(info.light_sensor.reading_topic, "rover/lightSensor");
        assert_eq!(info.light_sensor.image_topic, "rover/light_cam/image_raw");
        assert_eq!(
            info.light_sensor.camera_info_topic,
            "rover/light_cam/camera_info"
        );
        // 64 * (24 - 2) - 2
        assert_eq!(info.light_sensor.window_start, Some(1406));
        assert_eq!(info.sinks.len(), 1);

        let info = build_config_info(&scene, &args(false));
        assert!(info.sinks.is_empty());
    }
}
