//! LogSink - logs each reading via tracing

use contracts::{ContractError, DataSink, IlluminanceReading};
use tracing::{info, instrument};

/// Sink that logs one line per reading
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    /// Readings logged so far
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, reading),
        fields(sink = %self.name, seq = reading.seq())
    )]
    async fn write(&mut self, reading: &IlluminanceReading) -> Result<(), ContractError> {
        self.count += 1;
        info!(
            sink = %self.name,
            seq = reading.seq(),
            stamp = reading.header.stamp.as_secs_f64(),
            illuminance = reading.illuminance,
            "Illuminance reading"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, readings = self.count, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Stamp;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("console");
        let reading = IlluminanceReading::new(3, Stamp { sec: 1, nsec: 0 }, 99.5);

        assert!(sink.write(&reading).await.is_ok());
        assert!(sink.write(&reading).await.is_ok());
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.name(), "console");
    }
}
