//! Plugin capabilities - implemented by the plugin, invoked by the host
//!
//! The host calls these synchronously on its own update thread and never
//! concurrently for the same instance.

use crate::{ContractError, LightSensorConfig, SensorHandle};

/// Load / unload hooks
pub trait Lifecycle {
    /// Load the plugin against its parent sensor
    ///
    /// # Errors
    /// Fails when the messaging runtime is not initialized or the
    /// configuration is invalid for the sensor geometry. A failed load is
    /// terminal for the instance.
    fn on_load(&mut self, handle: SensorHandle, config: &LightSensorConfig)
        -> Result<(), ContractError>;

    /// Release publishers and borrowed host references
    fn on_unload(&mut self);
}

/// Frame-ready hook
pub trait FrameSink {
    /// Called once per rendered frame; `image` is only valid for this call
    fn on_new_frame(&mut self, image: &[u8], width: u32, height: u32, depth: u32, format: &str);
}
