//! Audio Input Control Service discovery

use async_trait::async_trait;
use log::debug;

use crate::bluetooth::uuids::{AICS_CHARACTERISTICS, AUDIO_INPUT_CONTROL_SERVICE};
use crate::config::SequencerConfig;
use crate::error::{HarnessError, SetupError};
use crate::harness::{Capabilities, ConnectionPair, DeviceRole, ProfileVerifier, Sequencer, TestSuite};
use crate::suites::fixtures::AicsFixture;
use crate::suites::{configuration_error, dut_and_ref};

pub const TEST_GATT_DISCOVER_AICS_SERVICE: &str = "test_gatt_discover_aics_service";
pub const TEST_AICS_SERVICE_EXPOSES_CHARACTERISTICS: &str = "test_aics_service_exposes_characteristics";

/// The device under test discovers an AICS instance hosted by the reference
pub struct AicsSuite {
    sequencer: Sequencer,
    verifier: ProfileVerifier,
    fixture: AicsFixture,
}

impl AicsSuite {
    pub fn new(config: SequencerConfig) -> Self {
        Self::with_fixture(config, AicsFixture::standard())
    }

    pub fn with_fixture(config: SequencerConfig, fixture: AicsFixture) -> Self {
        Self {
            verifier: ProfileVerifier::new(config.step_timeout),
            sequencer: Sequencer::new(config),
            fixture,
        }
    }

    async fn connect(&self, dut: &DeviceRole, reference: &DeviceRole) -> Result<ConnectionPair, HarnessError> {
        let pair = self
            .sequencer
            .connect_direct(dut, reference, self.fixture.advertise_request())
            .await?;
        Ok(pair)
    }
}

#[async_trait]
impl TestSuite for AicsSuite {
    fn name(&self) -> &str {
        "aics"
    }

    fn test_names(&self) -> Vec<&'static str> {
        vec![TEST_GATT_DISCOVER_AICS_SERVICE, TEST_AICS_SERVICE_EXPOSES_CHARACTERISTICS]
    }

    async fn setup_class(&self, devices: &[DeviceRole]) -> Result<(), SetupError> {
        let (dut, reference) = dut_and_ref(devices)?;
        dut.require(Capabilities::HOST | Capabilities::GATT_CLIENT)?;
        reference.require(Capabilities::HOST | Capabilities::SIMULATED_STACK | Capabilities::SERVICE_CONFIG)?;
        Ok(())
    }

    async fn setup_test(&self, devices: &[DeviceRole]) -> Result<(), SetupError> {
        let (_, reference) = dut_and_ref(devices)?;
        reference
            .add_aics_service(self.fixture.service.clone())
            .await
            .map_err(|e| configuration_error(reference, e))
    }

    async fn run_test(&self, name: &str, devices: &[DeviceRole]) -> Result<(), HarnessError> {
        let (dut, reference) = dut_and_ref(devices)?;
        match name {
            TEST_GATT_DISCOVER_AICS_SERVICE => {
                let pair = self.connect(dut, reference).await?;
                let services = self
                    .verifier
                    .verify_service_discovered(dut, &pair.dut_ref, AUDIO_INPUT_CONTROL_SERVICE)
                    .await?;
                debug!("{} discovered {} service(s)", dut.label(), services.len());
                Ok(())
            }
            TEST_AICS_SERVICE_EXPOSES_CHARACTERISTICS => {
                let pair = self.connect(dut, reference).await?;
                self.verifier
                    .verify_service_characteristics(dut, &pair.dut_ref, AUDIO_INPUT_CONTROL_SERVICE, &AICS_CHARACTERISTICS)
                    .await
            }
            other => Err(SetupError::UnknownTest(other.to_string()).into()),
        }
    }
}
