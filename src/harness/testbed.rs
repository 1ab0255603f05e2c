//! Testbeds hand out device roles for one test class

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use crate::bluetooth::Address;
use crate::config::{DeviceConfig, TestbedConfig};
use crate::error::SetupError;
use crate::harness::device::{DeviceDescriptor, DeviceRole, LinkRole};
use crate::sim::{SimDevice, SimDeviceOptions, SimulatedAir};

/// Source of device roles for a test class
#[async_trait]
pub trait Testbed: Send + Sync {
    /// Create the roles of the class, device under test first
    async fn create_devices(&self) -> Result<Vec<DeviceRole>, SetupError>;

    /// Release every role created by [`Testbed::create_devices`]
    async fn stop_all(&self, devices: Vec<DeviceRole>);
}

/// Address given to the device at `position` when none is configured
pub fn generated_address(position: usize) -> Address {
    let [hi, lo] = (position as u16 + 1).to_be_bytes();
    Address::new([0xC0, 0x00, 0x00, 0x00, hi, lo])
}

/// Testbed of simulated devices sharing one air medium
///
/// The first configured device is the central, every other device a
/// peripheral.
pub struct SimTestbed {
    config: TestbedConfig,
    air: SimulatedAir,
    devices: Mutex<HashMap<String, Arc<SimDevice>>>,
}

impl SimTestbed {
    pub fn new(config: TestbedConfig) -> Self {
        Self {
            config,
            air: SimulatedAir::new(),
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Medium shared by the devices of this testbed
    pub fn air(&self) -> &SimulatedAir {
        &self.air
    }

    /// Simulated device behind a label, while the class runs
    pub fn device(&self, label: &str) -> Option<Arc<SimDevice>> {
        self.devices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(label)
            .cloned()
    }

    fn options(device: &DeviceConfig) -> SimDeviceOptions {
        let mut options = SimDeviceOptions::default();
        if let Some(max_mtu) = device.max_mtu {
            options.max_mtu = max_mtu;
        }
        if let Some(interval) = device.scan_interval_ms {
            options.scan_interval = Duration::from_millis(interval);
        }
        options
    }

    fn shutdown_all(&self) {
        let devices: Vec<_> = self
            .devices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .map(|(_, device)| device)
            .collect();
        for device in devices {
            device.shutdown();
        }
    }
}

#[async_trait]
impl Testbed for SimTestbed {
    async fn create_devices(&self) -> Result<Vec<DeviceRole>, SetupError> {
        let mut roles = Vec::with_capacity(self.config.devices.len());

        for (position, device) in self.config.devices.iter().enumerate() {
            let address = device.address.unwrap_or_else(|| generated_address(position));
            let sim = match SimDevice::new(device.label.clone(), address, self.air.clone(), Self::options(device)) {
                Ok(sim) => Arc::new(sim),
                Err(e) => {
                    self.shutdown_all();
                    return Err(SetupError::UnsupportedRole {
                        role: device.label.clone(),
                        reason: e.to_string(),
                    });
                }
            };

            let link_role = if position == 0 { LinkRole::Central } else { LinkRole::Peripheral };
            let descriptor = DeviceDescriptor::for_kind(device.kind);
            debug!(
                "Created {} at {} as {} with {}",
                device.label,
                address,
                link_role,
                descriptor.capabilities.names()
            );

            self.devices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(device.label.clone(), sim.clone());
            roles.push(DeviceRole::from_stack(device.label.clone(), address, link_role, descriptor, sim));
        }

        info!("Testbed ready with {} device(s)", roles.len());
        Ok(roles)
    }

    async fn stop_all(&self, devices: Vec<DeviceRole>) {
        let labels: Vec<_> = devices.iter().map(|role| role.label().to_string()).collect();
        drop(devices);
        self.shutdown_all();
        info!("Stopped {}", labels.join(", "));
    }
}
