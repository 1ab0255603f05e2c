use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use profile_harness::config::{DeviceConfig, DeviceKind, TestbedConfig};
use profile_harness::harness::{DeviceRole, RunnerState, SimTestbed, TestOutcome, TestRunner, Testbed};
use profile_harness::suites::{AicsSuite, HapSuite};
use profile_harness::SetupError;

use super::common_utils::{fast_config, init_logging};

/// Testbed whose reference stops answering once created
struct UnreachableReference {
    inner: SimTestbed,
}

#[async_trait]
impl Testbed for UnreachableReference {
    async fn create_devices(&self) -> Result<Vec<DeviceRole>, SetupError> {
        let devices = self.inner.create_devices().await?;
        if let Some(reference) = self.inner.device("ref") {
            reference.set_reachable(false);
        }
        Ok(devices)
    }

    async fn stop_all(&self, devices: Vec<DeviceRole>) {
        self.inner.stop_all(devices).await
    }
}

#[tokio::test]
async fn test_scenario_a_aics_discovery() {
    init_logging();
    let testbed = Arc::new(SimTestbed::new(TestbedConfig::default()));
    let mut runner = TestRunner::new(testbed.clone());

    let report = runner.run(&AicsSuite::new(fast_config())).await;

    assert_eq!(report.setup_error, None);
    assert_eq!(report.outcome_of("test_gatt_discover_aics_service"), Some(TestOutcome::Passed));
    assert_eq!(report.outcome_of("test_aics_service_exposes_characteristics"), Some(TestOutcome::Passed));
    assert!(report.is_success());
    assert_eq!(testbed.air().attached_devices(), 0);
}

#[tokio::test]
async fn test_scenario_b_hap_presets() {
    init_logging();
    let testbed = Arc::new(SimTestbed::new(TestbedConfig::default()));
    let mut runner = TestRunner::new(testbed.clone());

    let report = runner.run(&HapSuite::new(fast_config()).unwrap()).await;

    assert_eq!(report.outcome_of("test_get_features"), Some(TestOutcome::Passed));
    assert_eq!(report.outcome_of("test_get_preset"), Some(TestOutcome::Passed));
    assert_eq!(report.passed(), 2);
    assert_eq!(
        runner.history(),
        &[
            RunnerState::Uninitialized,
            RunnerState::ClassSetup,
            RunnerState::TestSetup,
            RunnerState::Running,
            RunnerState::TestTeardown,
            RunnerState::TestSetup,
            RunnerState::Running,
            RunnerState::TestTeardown,
            RunnerState::ClassTeardown,
        ]
    );

    // Nothing outlives the class
    let air = testbed.air();
    assert_eq!(air.attached_devices(), 0);
    assert_eq!(air.active_links(), 0);
    assert_eq!(air.active_advertisements(), 0);
    assert_eq!(air.active_scans(), 0);
}

#[tokio::test]
async fn test_scenario_c_missing_capability_aborts_class() {
    init_logging();
    // Two platform stacks: the reference cannot host the service
    let config = TestbedConfig {
        devices: vec![
            DeviceConfig::new("dut", DeviceKind::Platform),
            DeviceConfig::new("ref", DeviceKind::Platform),
        ],
    };
    let testbed = Arc::new(SimTestbed::new(config));
    let mut runner = TestRunner::new(testbed.clone());

    let report = runner.run(&HapSuite::new(fast_config()).unwrap()).await;

    assert!(report.setup_error.as_deref().unwrap_or_default().contains("simulated-stack"));
    assert_eq!(report.skipped(), 2);
    assert!(!report.is_success());
    assert_eq!(
        runner.history(),
        &[RunnerState::Uninitialized, RunnerState::ClassSetup, RunnerState::ClassTeardown]
    );
    assert_eq!(testbed.air().attached_devices(), 0);
}

#[tokio::test]
async fn test_simulated_dut_cannot_run_hap() {
    let config = TestbedConfig {
        devices: vec![
            DeviceConfig::new("dut", DeviceKind::SimulatedStack),
            DeviceConfig::new("ref", DeviceKind::SimulatedStack),
        ],
    };
    let testbed = Arc::new(SimTestbed::new(config));
    let mut runner = TestRunner::new(testbed.clone());

    let report = runner.run(&HapSuite::new(fast_config()).unwrap()).await;

    assert_eq!(report.skipped(), 2);
    assert!(report.setup_error.is_some());
    assert_eq!(testbed.air().attached_devices(), 0);
}

#[tokio::test]
async fn test_single_device_is_not_enough() {
    let config = TestbedConfig {
        devices: vec![DeviceConfig::new("dut", DeviceKind::Platform)],
    };
    let mut runner = TestRunner::new(Arc::new(SimTestbed::new(config)));

    let report = runner.run(&AicsSuite::new(fast_config())).await;

    assert_eq!(report.skipped(), 2);
    assert_eq!(
        report.setup_error,
        Some(SetupError::NotEnoughDevices { required: 2, available: 1 }.to_string())
    );
}

#[tokio::test]
async fn test_unreachable_reference_aborts_at_test_setup() {
    init_logging();
    let inner = SimTestbed::new(TestbedConfig::default());
    let air = inner.air().clone();
    let mut runner = TestRunner::new(Arc::new(UnreachableReference { inner }));

    let report = runner.run(&AicsSuite::new(fast_config())).await;

    assert_eq!(report.tests[0].outcome, TestOutcome::Error);
    assert!(report.tests[0].message.as_deref().unwrap_or_default().contains("Failed to reset ref"));
    assert_eq!(report.tests[1].outcome, TestOutcome::Skipped);
    assert_eq!(runner.state(), RunnerState::ClassTeardown);
    assert_eq!(air.attached_devices(), 0);
}
