//! Test case runner
//!
//! Drives one suite through class setup, per-test setup, test bodies and
//! teardown. A setup abort skips every remaining test of the class; class
//! teardown releases the device roles whatever happened before.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::error::{ErrorCategory, HarnessError, SetupError};
use crate::harness::device::DeviceRole;
use crate::harness::report::{SuiteReport, TestOutcome, TestReport};
use crate::harness::testbed::Testbed;

/// Runner lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    Uninitialized,
    ClassSetup,
    TestSetup,
    Running,
    TestTeardown,
    ClassTeardown,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Uninitialized => "uninitialized",
            RunnerState::ClassSetup => "class_setup",
            RunnerState::TestSetup => "test_setup",
            RunnerState::Running => "running",
            RunnerState::TestTeardown => "test_teardown",
            RunnerState::ClassTeardown => "class_teardown",
        };
        f.write_str(name)
    }
}

/// A class of tests sharing device roles
#[async_trait]
pub trait TestSuite: Send + Sync {
    fn name(&self) -> &str;

    /// Tests in execution order
    fn test_names(&self) -> Vec<&'static str>;

    /// Check the roles provided by the testbed; an error aborts the class
    async fn setup_class(&self, devices: &[DeviceRole]) -> Result<(), SetupError>;

    /// Configure freshly reset roles before one test
    async fn setup_test(&self, devices: &[DeviceRole]) -> Result<(), SetupError>;

    async fn run_test(&self, name: &str, devices: &[DeviceRole]) -> Result<(), HarnessError>;

    async fn teardown_test(&self, _devices: &[DeviceRole]) {}
}

/// Reset every role, all at once
pub async fn reset_all(devices: &[DeviceRole]) -> Result<(), SetupError> {
    let results = futures::future::join_all(devices.iter().map(|device| device.reset())).await;
    results.into_iter().collect()
}

/// Runs suites against roles provided by a testbed
pub struct TestRunner {
    testbed: Arc<dyn Testbed>,
    state: RunnerState,
    history: Vec<RunnerState>,
}

impl TestRunner {
    pub fn new(testbed: Arc<dyn Testbed>) -> Self {
        Self {
            testbed,
            state: RunnerState::Uninitialized,
            history: vec![RunnerState::Uninitialized],
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// States entered during the last run, in order
    pub fn history(&self) -> &[RunnerState] {
        &self.history
    }

    fn transition(&mut self, next: RunnerState) {
        debug!("Runner {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Run every test of `suite`
    pub async fn run(&mut self, suite: &dyn TestSuite) -> SuiteReport {
        self.state = RunnerState::Uninitialized;
        self.history = vec![RunnerState::Uninitialized];
        let started_at = Utc::now();
        let names = suite.test_names();
        info!("Running {} ({} test(s))", suite.name(), names.len());

        self.transition(RunnerState::ClassSetup);
        let devices = match self.testbed.create_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                error!("{} aborted: {}", suite.name(), e);
                self.transition(RunnerState::ClassTeardown);
                let tests = names.iter().map(|name| TestReport::skipped(*name, e.to_string())).collect();
                return self.report(suite, started_at, Some(e.to_string()), tests);
            }
        };

        let mut setup_error = match suite.setup_class(&devices).await {
            Ok(()) => None,
            Err(e) => {
                error!("{} aborted: {}", suite.name(), e);
                Some(e.to_string())
            }
        };

        let mut tests = Vec::with_capacity(names.len());
        for name in names {
            if let Some(reason) = &setup_error {
                tests.push(TestReport::skipped(name, reason.clone()));
                continue;
            }

            let (report, abort) = self.run_one(suite, name, &devices).await;
            tests.push(report);
            if let Some(e) = abort {
                error!("{} aborted: {}", suite.name(), e);
                setup_error = Some(e.to_string());
            }
        }

        self.transition(RunnerState::ClassTeardown);
        self.testbed.stop_all(devices).await;

        self.report(suite, started_at, setup_error, tests)
    }

    /// Run one test; returns its report and the setup error that aborts the class, if any
    async fn run_one(
        &mut self,
        suite: &dyn TestSuite,
        name: &str,
        devices: &[DeviceRole],
    ) -> (TestReport, Option<SetupError>) {
        let started_at = Utc::now();
        let start = Instant::now();

        self.transition(RunnerState::TestSetup);
        let setup = match reset_all(devices).await {
            Ok(()) => suite.setup_test(devices).await,
            Err(e) => Err(e),
        };

        let (outcome, message, abort) = match setup {
            Err(e) => (TestOutcome::Error, Some(e.to_string()), Some(e)),
            Ok(()) => {
                self.transition(RunnerState::Running);
                match suite.run_test(name, devices).await {
                    Ok(()) => (TestOutcome::Passed, None, None),
                    Err(e) => {
                        let outcome = match e.category() {
                            ErrorCategory::Assertion => TestOutcome::Failed,
                            ErrorCategory::Sequence | ErrorCategory::Setup => TestOutcome::Error,
                        };
                        warn!("{}::{} {:?}: {}", suite.name(), name, outcome, e);
                        (outcome, Some(e.to_string()), None)
                    }
                }
            }
        };

        self.transition(RunnerState::TestTeardown);
        suite.teardown_test(devices).await;

        let duration = start.elapsed();
        if outcome == TestOutcome::Passed {
            info!("{}::{} passed in {:?}", suite.name(), name, duration);
        }

        let report = TestReport {
            name: name.to_string(),
            outcome,
            message,
            started_at,
            duration,
        };
        (report, abort)
    }

    fn report(
        &self,
        suite: &dyn TestSuite,
        started_at: chrono::DateTime<Utc>,
        setup_error: Option<String>,
        tests: Vec<TestReport>,
    ) -> SuiteReport {
        let report = SuiteReport {
            suite: suite.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            setup_error,
            tests,
            states: self.history.clone(),
        };
        info!("{}", report.summary());
        report
    }
}
