//! Profile test suites
//!
//! Every suite runs against two roles: the device under test, acting as
//! central, and a simulated reference peripheral hosting the profile service.

pub mod aics;
pub mod fixtures;
pub mod hap;

use crate::config::SequencerConfig;
use crate::error::{RpcError, SetupError};
use crate::harness::{DeviceRole, TestSuite};

pub use aics::AicsSuite;
pub use fixtures::{AicsFixture, HapFixture};
pub use hap::HapSuite;

/// Names accepted by [`suite_by_name`]
pub const SUITE_NAMES: [&str; 2] = ["aics", "hap"];

/// Device under test and reference, in testbed order
pub fn dut_and_ref(devices: &[DeviceRole]) -> Result<(&DeviceRole, &DeviceRole), SetupError> {
    match devices {
        [dut, reference, ..] => Ok((dut, reference)),
        _ => Err(SetupError::NotEnoughDevices {
            required: 2,
            available: devices.len(),
        }),
    }
}

fn configuration_error(role: &DeviceRole, error: RpcError) -> SetupError {
    SetupError::ServiceConfiguration {
        role: role.label().to_string(),
        reason: error.to_string(),
    }
}

/// Build a suite by name with fresh fixtures
pub fn suite_by_name(name: &str, config: &SequencerConfig) -> Result<Option<Box<dyn TestSuite>>, RpcError> {
    let suite: Box<dyn TestSuite> = match name {
        "aics" => Box::new(AicsSuite::new(config.clone())),
        "hap" => Box::new(HapSuite::new(config.clone())?),
        _ => return Ok(None),
    };
    Ok(Some(suite))
}
