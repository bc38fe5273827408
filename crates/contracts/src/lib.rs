//! # Contracts
//!
//! Frozen interface contracts between the light sensor plugin, its host and
//! the message bus. Business crates depend on this crate only, never on each
//! other's internals.
//!
//! ## Time Model
//! - Simulator time (`Duration`, integer nanoseconds) drives throttling
//! - Reading headers carry wall time taken from the messaging runtime
//! - Frames are borrowed for the duration of a single callback

mod config;
mod error;
mod frame;
mod host;
mod message;
mod plugin;
mod sink;
mod window;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use host::*;
pub use message::*;
pub use plugin::{FrameSink, Lifecycle};
pub use sink::*;
pub use window::SamplingWindow;
