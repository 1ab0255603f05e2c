//! Hearing Access Profile client tests
//!
//! The reference hosts a Hearing Access Service and advertises it; the device
//! under test scans for it, connects, pairs and reads the service through its
//! HAP client.

use async_trait::async_trait;

use crate::bluetooth::uuids::HEARING_ACCESS_SERVICE;
use crate::config::SequencerConfig;
use crate::error::{HarnessError, RpcError, SetupError};
use crate::harness::{Capabilities, ConnectionPair, DeviceRole, ProfileVerifier, ScanFilter, Sequencer, TestSuite};
use crate::suites::fixtures::HapFixture;
use crate::suites::{configuration_error, dut_and_ref};

pub const TEST_GET_FEATURES: &str = "test_get_features";
pub const TEST_GET_PRESET: &str = "test_get_preset";

pub struct HapSuite {
    sequencer: Sequencer,
    verifier: ProfileVerifier,
    fixture: HapFixture,
}

impl HapSuite {
    pub fn new(config: SequencerConfig) -> Result<Self, RpcError> {
        Ok(Self::with_fixture(config, HapFixture::standard()?))
    }

    pub fn with_fixture(config: SequencerConfig, fixture: HapFixture) -> Self {
        Self {
            verifier: ProfileVerifier::new(config.step_timeout),
            sequencer: Sequencer::new(config),
            fixture,
        }
    }

    pub fn fixture(&self) -> &HapFixture {
        &self.fixture
    }

    /// Connect, pair and attach the HAP client
    async fn setup_hap_connection(
        &self,
        dut: &DeviceRole,
        reference: &DeviceRole,
    ) -> Result<ConnectionPair, HarnessError> {
        let mut advertisement = self
            .sequencer
            .advertise(reference, self.fixture.advertise_request())
            .await?;

        let result = async {
            let filter = ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE);
            let pair = self
                .sequencer
                .connect_advertised(dut, reference, &mut advertisement, filter)
                .await?;
            self.sequencer.secure(dut, reference, &pair).await?;
            self.sequencer.wait_peripheral(dut, &pair).await?;
            Ok::<_, HarnessError>(pair)
        }
        .await;

        // Already released by the connect step; cancelling again is a no-op
        advertisement.cancel();
        result
    }
}

#[async_trait]
impl TestSuite for HapSuite {
    fn name(&self) -> &str {
        "hap"
    }

    fn test_names(&self) -> Vec<&'static str> {
        vec![TEST_GET_FEATURES, TEST_GET_PRESET]
    }

    async fn setup_class(&self, devices: &[DeviceRole]) -> Result<(), SetupError> {
        let (dut, reference) = dut_and_ref(devices)?;

        if dut.has(Capabilities::SIMULATED_STACK) {
            return Err(SetupError::UnsupportedRole {
                role: dut.label().to_string(),
                reason: "a simulated stack does not support HAP as client".to_string(),
            });
        }
        dut.require(Capabilities::HOST | Capabilities::SECURITY | Capabilities::GATT_CLIENT | Capabilities::HAP_CLIENT)?;
        reference.require(
            Capabilities::HOST | Capabilities::SECURITY | Capabilities::SIMULATED_STACK | Capabilities::SERVICE_CONFIG,
        )?;
        Ok(())
    }

    async fn setup_test(&self, devices: &[DeviceRole]) -> Result<(), SetupError> {
        let (_, reference) = dut_and_ref(devices)?;
        let service = self
            .fixture
            .service_config()
            .map_err(|e| configuration_error(reference, e))?;
        reference
            .add_hearing_access_service(service)
            .await
            .map_err(|e| configuration_error(reference, e))
    }

    async fn run_test(&self, name: &str, devices: &[DeviceRole]) -> Result<(), HarnessError> {
        let (dut, reference) = dut_and_ref(devices)?;
        match name {
            TEST_GET_FEATURES => {
                let pair = self.setup_hap_connection(dut, reference).await?;
                self.verifier
                    .verify_features(dut, &pair.dut_ref, &self.fixture.features)
                    .await
            }
            TEST_GET_PRESET => {
                let pair = self.setup_hap_connection(dut, reference).await?;
                self.verifier
                    .verify_presets(dut, &pair.dut_ref, &self.fixture.presets)
                    .await
            }
            other => Err(SetupError::UnknownTest(other.to_string()).into()),
        }
    }
}
