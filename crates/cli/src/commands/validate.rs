//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SceneConfig, WindowOrigin};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sensor: String,
    image: String,
    fov: u32,
    update_rate: f64,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(scene) => {
            let warnings = collect_warnings(&scene);
            let image = &scene.sensor.image;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", scene.version),
                    sensor: scene.sensor.name.clone(),
                    image: format!(
                        "{}x{} {}",
                        image.width,
                        image.height,
                        image.format.as_str()
                    ),
                    fov: scene.plugin.fov,
                    update_rate: scene.plugin.update_rate,
                    sink_count: scene.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(scene: &SceneConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if scene.sinks.is_empty() {
        warnings.push("No sinks configured - readings will not be consumed".to_string());
    }

    let plugin = &scene.plugin;
    if plugin.update_rate > scene.sensor.update_rate && scene.sensor.update_rate > 0.0 {
        warnings.push(format!(
            "plugin.update_rate ({} Hz) exceeds the camera rate ({} Hz) - one reading per frame at most",
            plugin.update_rate, scene.sensor.update_rate
        ));
    }

    if plugin.window_origin == WindowOrigin::Reference {
        warnings.push(
            "plugin.window_origin = reference samples near the start of the middle row, not the image center"
                .to_string(),
        );
    }

    if !scene.sensor.always_on {
        warnings.push(
            "sensor.always_on is false - the first frame after a subscriber connects only activates the sensor"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sensor: {}", summary.sensor);
            println!("  Image: {}", summary.image);
            println!("  Window: {}x{}", summary.fov, summary.fov);
            println!("  Publish rate: {} Hz", summary.update_rate);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
