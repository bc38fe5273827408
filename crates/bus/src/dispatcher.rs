//! Dispatcher - fans readings from a bus subscription out to sinks

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{IlluminanceReading, SinkConfig, SinkType};

use crate::error::BusError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: broadcast::Receiver<IlluminanceReading>,
}

impl DispatcherBuilder {
    pub fn new(
        config: DispatcherConfig,
        input_rx: broadcast::Receiver<IlluminanceReading>,
    ) -> Self {
        Self { config, input_rx }
    }

    /// Create every sink and spawn its worker
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(sink_count = self.config.sinks.len())
    )]
    pub fn build(self) -> Result<Dispatcher, BusError> {
        let mut handles = Vec::with_capacity(self.config.sinks.len());
        for sink_config in &self.config.sinks {
            handles.push(create_sink_handle(sink_config)?);
        }

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, BusError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| BusError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Summary returned when the dispatcher stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Readings received from the bus
    pub received: u64,

    /// Readings the bus overwrote before the dispatcher saw them
    pub lagged: u64,

    /// Final per-sink counters
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

/// Fans out readings to sinks until the topic closes
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: broadcast::Receiver<IlluminanceReading>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: broadcast::Receiver<IlluminanceReading>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Current metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns once the reading topic is closed and every sink has drained.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchReport {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut report = DispatchReport::default();

        loop {
            match self.input_rx.recv().await {
                Ok(reading) => {
                    report.received += 1;
                    self.dispatch(&reading);

                    if report.received.is_multiple_of(100) {
                        debug!(readings = report.received, "Dispatcher progress");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    report.lagged += skipped;
                    warn!(skipped, "Dispatcher lagged behind bus, readings lost");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!(
            readings = report.received,
            lagged = report.lagged,
            "Reading topic closed, shutting down"
        );

        let metrics: Vec<_> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().clone()))
            .collect();
        for handle in self.handles {
            handle.shutdown().await;
        }
        report.sinks = metrics
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect();

        info!("Dispatcher shutdown complete");
        report
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run())
    }

    fn dispatch(&self, reading: &IlluminanceReading) {
        for handle in &self.handles {
            handle.offer(reading.clone());
        }
    }
}

/// Create a dispatcher from sink configs
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: broadcast::Receiver<IlluminanceReading>,
) -> Result<Dispatcher, BusError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build()
}
