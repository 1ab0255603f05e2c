//! In-memory Bluetooth stack used as the harness collaborator
//!
//! Devices attached to the same [`SimulatedAir`] see each other's
//! advertisements, connect, pair and serve the profile services configured
//! on them.

mod air;
mod device;

pub use air::SimulatedAir;
pub use device::{DeviceServices, SimDevice, SimDeviceOptions};
