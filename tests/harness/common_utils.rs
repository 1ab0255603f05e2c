//! Shared helpers for harness tests

use std::sync::Arc;
use std::time::Duration;

use profile_harness::bluetooth::Address;
use profile_harness::config::{DeviceKind, SequencerConfig};
use profile_harness::harness::{DeviceDescriptor, DeviceRole, LinkRole};
use profile_harness::sim::{SimDevice, SimDeviceOptions, SimulatedAir};

/// Route `log` output through the test harness capture
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sequencer settings with short timeouts
pub fn fast_config() -> SequencerConfig {
    SequencerConfig {
        scan_timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(2),
        security_timeout: Duration::from_secs(2),
        step_timeout: Duration::from_secs(2),
        ..SequencerConfig::default()
    }
}

pub fn address(last: u8) -> Address {
    Address::new([0xC0, 0x11, 0x22, 0x33, 0x44, last])
}

/// A simulated device with the role handle built over it
pub struct SimRole {
    pub device: Arc<SimDevice>,
    pub role: DeviceRole,
}

pub fn sim_role(air: &SimulatedAir, label: &str, last: u8, kind: DeviceKind, link_role: LinkRole) -> SimRole {
    let options = SimDeviceOptions {
        scan_interval: Duration::from_millis(5),
        ..SimDeviceOptions::default()
    };
    sim_role_with(air, label, last, kind, link_role, options)
}

pub fn sim_role_with(
    air: &SimulatedAir,
    label: &str,
    last: u8,
    kind: DeviceKind,
    link_role: LinkRole,
    options: SimDeviceOptions,
) -> SimRole {
    let device = Arc::new(SimDevice::new(label, address(last), air.clone(), options).expect("attach device"));
    let role = DeviceRole::from_stack(
        label,
        address(last),
        link_role,
        DeviceDescriptor::for_kind(kind),
        device.clone(),
    );
    SimRole { device, role }
}

/// Device under test (platform stack, central) and reference (simulated
/// stack, peripheral) on a fresh medium
pub fn dut_and_ref() -> (SimulatedAir, SimRole, SimRole) {
    let air = SimulatedAir::new();
    let dut = sim_role(&air, "dut", 1, DeviceKind::Platform, LinkRole::Central);
    let reference = sim_role(&air, "ref", 2, DeviceKind::SimulatedStack, LinkRole::Peripheral);
    (air, dut, reference)
}
