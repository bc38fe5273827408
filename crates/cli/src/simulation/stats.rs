//! Run statistics.

use std::time::Duration;

use bus::DispatchReport;
use light_sensor::MetricsSnapshot;
use observability::IlluminanceAggregator;

/// Statistics from a simulation run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Frames handed to the plugin
    pub frames_delivered: u64,

    /// Simulated seconds covered by the run
    pub sim_time: f64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Number of sinks that received readings
    pub active_sinks: usize,

    /// Whether the run was cut short by a shutdown signal
    pub interrupted: bool,

    /// Plugin counters at the end of the run
    pub plugin: MetricsSnapshot,

    /// Dispatcher report (absent when no sinks are configured)
    pub dispatch: Option<DispatchReport>,

    /// Outcome and illuminance aggregation
    pub readings: IlluminanceAggregator,
}

impl RunStats {
    /// Frames per wall-clock second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_delivered as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Readings the sinks lost to bus lag or full queues
    pub fn readings_lost(&self) -> u64 {
        self.dispatch.as_ref().map_or(0, |report| {
            report.lagged + report.sinks.iter().map(|(_, m)| m.dropped).sum::<u64>()
        })
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Light Sensor Run ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Simulated time: {:.3}s", self.sim_time);
        println!("   ├─ Frames delivered: {}", self.frames_delivered);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Active sinks: {}", self.active_sinks);
        println!("   └─ Interrupted: {}", self.interrupted);

        println!("\nPlugin");
        println!("   ├─ Activations: {}", self.plugin.activations);
        println!("   ├─ Inactive frames: {}", self.plugin.frames_inactive);
        println!("   ├─ Frames without subscribers: {}", self.plugin.frames_idle);
        println!("   ├─ Throttled frames: {}", self.plugin.frames_throttled);
        println!("   ├─ Rejected frames: {}", self.plugin.frames_rejected);
        println!("   └─ Readings published: {}", self.plugin.readings_published);

        print!("\n{}", self.readings.summary());

        if let Some(ref report) = self.dispatch {
            println!("\nSinks");
            println!("   ├─ Readings received: {}", report.received);
            println!("   ├─ Readings lost: {}", self.readings_lost());
            for (i, (name, metrics)) in report.sinks.iter().enumerate() {
                let prefix = if i == report.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: written={}, failed={}, dropped={}, missed={}",
                    prefix, name, metrics.written, metrics.failed, metrics.dropped, metrics.missed
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::MetricsSnapshot as SinkSnapshot;

    #[test]
    fn test_fps() {
        let stats = RunStats {
            frames_delivered: 120,
            duration: Duration::from_secs(4),
            ..Default::default()
        };
        assert_eq!(stats.fps(), 30.0);
        assert_eq!(RunStats::default().fps(), 0.0);
    }

    #[test]
    fn test_readings_lost() {
        let stats = RunStats {
            dispatch: Some(DispatchReport {
                received: 10,
                lagged: 2,
                sinks: vec![(
                    "file".to_string(),
                    SinkSnapshot {
                        dropped: 3,
                        ..Default::default()
                    },
                )],
            }),
            ..Default::default()
        };
        assert_eq!(stats.readings_lost(), 5);
    }
}
