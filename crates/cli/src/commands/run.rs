//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::SceneConfig;
use light_sensor::FramePattern;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

use crate::cli::{PatternKind, RunArgs};
use crate::simulation::{load_still, Simulation, SimulationConfig};

/// Execute the `run` command
pub async fn run_simulation(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut scene = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(rate) = args.update_rate {
        info!(update_rate = rate, "Overriding plugin update rate from CLI");
        scene.plugin.update_rate = rate;
    }
    if let Some(fov) = args.fov {
        info!(fov, "Overriding sampling window size from CLI");
        scene.plugin.fov = fov;
    }
    config_loader::ConfigLoader::validate(&scene).context("Invalid CLI override")?;

    info!(
        sensor = %scene.sensor.name,
        width = scene.sensor.image.width,
        height = scene.sensor.image.height,
        format = %scene.sensor.image.format.as_str(),
        fov = scene.plugin.fov,
        update_rate = scene.plugin.update_rate,
        sinks = scene.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&scene);
        return Ok(());
    }

    let pattern = match args.image {
        Some(ref path) => {
            info!(image = %path.display(), "Using still image frames");
            FramePattern::Still(load_still(path, &scene.geometry())?)
        }
        None => pattern_from_args(args),
    };

    let simulation = Simulation::new(SimulationConfig {
        scene,
        frames: if args.frames == 0 {
            None
        } else {
            Some(args.frames)
        },
        pattern,
        realtime: args.realtime,
        topic_capacity: args.topic_capacity,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    // Setup graceful shutdown handler
    let stop = simulation.stop_flag();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping simulation...");
        stop.store(true, Ordering::Release);
    });

    info!("Starting simulation...");
    let result = simulation.run().await;
    signal_task.abort();

    let stats = result.context("Simulation failed")?;
    info!(
        frames = stats.frames_delivered,
        readings = stats.plugin.readings_published,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Simulation completed"
    );
    stats.print_summary();

    info!("Light sensor finished");
    Ok(())
}

fn pattern_from_args(args: &RunArgs) -> FramePattern {
    match args.pattern {
        PatternKind::Uniform => FramePattern::Uniform(args.value),
        PatternKind::Gradient => FramePattern::HorizontalGradient,
        PatternKind::Checkerboard => FramePattern::Checkerboard(args.cell),
    }
}

/// Wait for Ctrl+C or SIGTERM
///
/// A handler that fails to install never fires; the run then ends on its frame limit.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(scene: &SceneConfig) {
    let image = &scene.sensor.image;
    let plugin = &scene.plugin;

    println!("\n=== Configuration Summary ===\n");
    println!("Camera:");
    println!("  Name: {}", scene.sensor.name);
    println!(
        "  Image: {}x{} {}",
        image.width,
        image.height,
        image.format.as_str()
    );
    println!("  Render rate: {} Hz", scene.sensor.update_rate);
    println!("  Always on: {}", scene.sensor.always_on);

    println!("\nLight sensor:");
    println!("  Window: {}x{} ({:?})", plugin.fov, plugin.fov, plugin.window_origin);
    if plugin.update_rate > 0.0 {
        println!("  Publish rate: {} Hz", plugin.update_rate);
    } else {
        println!("  Publish rate: every frame");
    }
    if !plugin.robot_namespace.is_empty() {
        println!("  Namespace: {}", plugin.robot_namespace);
    }
    println!("  Topic: {}", plugin.topic_name);

    if !scene.sinks.is_empty() {
        println!("\nSinks ({}):", scene.sinks.len());
        for sink in &scene.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["light-sensor", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_pattern_from_args() {
        let args = run_args(&["--pattern", "checkerboard", "--cell", "4"]);
        assert!(matches!(
            pattern_from_args(&args),
            FramePattern::Checkerboard(4)
        ));

        let args = run_args(&["--value", "7"]);
        assert!(matches!(pattern_from_args(&args), FramePattern::Uniform(7)));
    }

    #[tokio::test]
    async fn test_missing_config_fails() {
        let args = run_args(&["--config", "/nonexistent/scene.toml"]);
        let err = run_simulation(&args).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_dry_run_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");
        std::fs::write(
            &path,
            r#"
[sensor]
name = "cam"

[sensor.image]
width = 32
height = 24
"#,
        )
        .unwrap();
        let path_str = path.display().to_string();

        let args = run_args(&["--config", &path_str, "--dry-run", "--fov", "4"]);
        assert!(run_simulation(&args).await.is_ok());

        // fov 为 0 的覆盖值被拒绝
        let args = run_args(&["--config", &path_str, "--dry-run", "--fov", "0"]);
        assert!(run_simulation(&args).await.is_err());
    }
}
