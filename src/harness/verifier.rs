//! Profile state verification over an established connection
//!
//! The verifier only reads; it never mutates server-side state. Comparisons
//! are exact on every field.

use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use uuid::Uuid;

use crate::bluetooth::{Connection, GattServiceDescriptor};
use crate::error::{AssertionFailure, RpcError, SequenceError};
use crate::harness::device::DeviceRole;
use crate::profiles::{to_domain_presets, HearingAidFeatures, PresetRecord};
use crate::Result;

/// Compare retrieved preset records against the expected sequence
///
/// Length, order and every field must match.
pub fn compare_presets(actual: &[PresetRecord], expected: &[PresetRecord]) -> std::result::Result<(), AssertionFailure> {
    if actual == expected {
        return Ok(());
    }

    let what = if actual.len() != expected.len() {
        format!("preset record count ({} expected, {} retrieved)", expected.len(), actual.len())
    } else {
        let position = actual
            .iter()
            .zip(expected)
            .position(|(a, e)| a != e)
            .unwrap_or_default();
        format!("preset record at position {}", position)
    };
    Err(AssertionFailure::new(what, expected, actual))
}

/// Issues profile reads and asserts over the results
#[derive(Debug, Clone)]
pub struct ProfileVerifier {
    step_timeout: Duration,
}

impl ProfileVerifier {
    pub fn new(step_timeout: Duration) -> Self {
        Self { step_timeout }
    }

    async fn read<T, F>(&self, step: &'static str, future: F) -> std::result::Result<T, SequenceError>
    where
        F: Future<Output = std::result::Result<T, RpcError>>,
    {
        match tokio::time::timeout(self.step_timeout, future).await {
            Ok(result) => result.map_err(|source| SequenceError::Rpc { step, source }),
            Err(_) => Err(SequenceError::Timeout {
                step,
                timeout: self.step_timeout,
            }),
        }
    }

    /// The features read by `role` must equal `expected`
    pub async fn verify_features(
        &self,
        role: &DeviceRole,
        connection: &Connection,
        expected: &HearingAidFeatures,
    ) -> Result<()> {
        let bytes = self.read("get_features", role.get_features(connection)).await?;
        let actual = HearingAidFeatures::from_bytes(&bytes)?;
        debug!("{} read features {:?}", role.label(), actual);

        if actual != *expected {
            return Err(AssertionFailure::new("hearing aid features", expected, &actual).into());
        }
        info!("{} features match", role.label());
        Ok(())
    }

    /// The preset records read by `role` must equal `expected` sorted by index
    pub async fn verify_presets(
        &self,
        role: &DeviceRole,
        connection: &Connection,
        expected: &[PresetRecord],
    ) -> Result<()> {
        let records = self
            .read("get_all_preset_records", role.get_all_preset_records(connection))
            .await?;
        let actual = to_domain_presets(&records)?;
        debug!("{} read {} preset record(s)", role.label(), actual.len());

        let mut sorted = expected.to_vec();
        sorted.sort_by_key(|record| record.index);
        compare_presets(&actual, &sorted)?;

        info!("{} preset records match", role.label());
        Ok(())
    }

    /// Discovery from `role` must report a service with `uuid`
    pub async fn verify_service_discovered(
        &self,
        role: &DeviceRole,
        connection: &Connection,
        uuid: Uuid,
    ) -> Result<Vec<GattServiceDescriptor>> {
        let services = self.read("discover_services", role.discover_services(connection)).await?;
        let uuids: Vec<Uuid> = services.iter().map(|service| service.uuid).collect();
        debug!("{} discovered {:?}", role.label(), uuids);

        if !uuids.contains(&uuid) {
            return Err(AssertionFailure::new(format!("discovered services containing {}", uuid), &[uuid], &uuids).into());
        }
        Ok(services)
    }

    /// The service `uuid` discovered by `role` must expose every characteristic
    pub async fn verify_service_characteristics(
        &self,
        role: &DeviceRole,
        connection: &Connection,
        uuid: Uuid,
        characteristics: &[Uuid],
    ) -> Result<()> {
        let services = self.verify_service_discovered(role, connection, uuid).await?;

        let exposed: Vec<Uuid> = services
            .iter()
            .filter(|service| service.uuid == uuid)
            .flat_map(|service| service.characteristics.iter().copied())
            .collect();
        let missing: Vec<Uuid> = characteristics
            .iter()
            .filter(|characteristic| !exposed.contains(characteristic))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(AssertionFailure::new(format!("characteristics of {}", uuid), characteristics, &exposed).into());
        }
        Ok(())
    }
}
