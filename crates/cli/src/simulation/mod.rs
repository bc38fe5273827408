//! Simulated host: camera, clock, bus and sinks around one plugin instance.

mod host;
mod stats;
mod still;

pub use host::{Simulation, SimulationConfig};
pub use stats::RunStats;
pub use still::load_still;
