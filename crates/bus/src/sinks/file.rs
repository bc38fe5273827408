//! FileSink - appends readings to a JSON Lines file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use contracts::{ContractError, DataSink, IlluminanceReading};
use tracing::{debug, error, instrument};

/// Default output file
pub const DEFAULT_OUTPUT_PATH: &str = "./output/illuminance.jsonl";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,

    /// Keep existing content instead of truncating
    pub append: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            append: false,
        }
    }
}

impl FileSinkConfig {
    /// Create config from params map (`path`, `append`)
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
        let append = params
            .get("append")
            .is_some_and(|v| matches!(v.as_str(), "true" | "1" | "yes"));

        Self { path, append }
    }
}

/// Sink that writes one JSON object per reading
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append_line(&mut self, reading: &IlluminanceReading) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, reading)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn sink_error(&self, e: std::io::Error) -> ContractError {
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, reading),
        fields(sink = %self.name, seq = reading.seq())
    )]
    async fn write(&mut self, reading: &IlluminanceReading) -> Result<(), ContractError> {
        self.append_line(reading).map_err(|e| {
            error!(sink = %self.name, seq = reading.seq(), error = %e, "Write failed");
            self.sink_error(e)
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.sink_error(e))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.sink_error(e))?;
        debug!(sink = %self.name, path = %self.path.display(), lines = self.lines, "FileSink closed");
        Ok(())
    }
}
