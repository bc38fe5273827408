//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Light Sensor - camera-frame illuminance sensor on a simulated host
#[derive(Parser, Debug)]
#[command(
    name = "light-sensor",
    author,
    version,
    about = "Camera-frame illuminance sensor",
    long_about = "Turns a simulated camera into a light sensor.\n\n\
                  Loads a scene description, attaches the light sensor plugin to a \n\
                  simulated camera, drives rendered frames through it and routes the \n\
                  published illuminance readings to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LIGHT_SENSOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LIGHT_SENSOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive frames through the plugin on a simulated host
    Run(RunArgs),

    /// Validate a scene file without running
    Validate(ValidateArgs),

    /// Display scene information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to scene file (TOML or JSON)
    #[arg(short, long, default_value = "scene.toml", env = "LIGHT_SENSOR_CONFIG")]
    pub config: PathBuf,

    /// Number of frames to render (0 = until Ctrl-C)
    #[arg(long, default_value = "300", env = "LIGHT_SENSOR_FRAMES")]
    pub frames: u64,

    /// Synthetic frame pattern
    #[arg(long, value_enum, default_value = "uniform")]
    pub pattern: PatternKind,

    /// Sample value for the uniform pattern
    #[arg(long, default_value = "128")]
    pub value: u8,

    /// Cell size for the checkerboard pattern (pixels)
    #[arg(long, default_value = "8")]
    pub cell: u32,

    /// Use a still image instead of a synthetic pattern
    #[arg(long, conflicts_with = "pattern")]
    pub image: Option<PathBuf>,

    /// Override the plugin publish rate (Hz)
    #[arg(long, env = "LIGHT_SENSOR_UPDATE_RATE")]
    pub update_rate: Option<f64>,

    /// Override the sampling window size
    #[arg(long)]
    pub fov: Option<u32>,

    /// Pace frames in wall-clock time at the sensor rate
    #[arg(long)]
    pub realtime: bool,

    /// Validate the scene and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Per-topic buffer length on the bus
    #[arg(long, default_value = "64", env = "LIGHT_SENSOR_TOPIC_CAPACITY")]
    pub topic_capacity: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LIGHT_SENSOR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to scene file to validate
    #[arg(short, long, default_value = "scene.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to scene file
    #[arg(short, long, default_value = "scene.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Synthetic frame pattern
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatternKind {
    /// Every sample has the same value
    #[default]
    Uniform,
    /// Left-to-right ramp from 0 to 255
    Gradient,
    /// Black and white squares
    Checkerboard,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
