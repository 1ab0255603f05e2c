//! Per-test and per-suite results

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::harness::runner::RunnerState;

/// Outcome of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// Body completed and every assertion held
    Passed,
    /// An assertion over profile state failed
    Failed,
    /// A sequence step failed or the test could not be set up
    Error,
    /// Not run because the class was aborted
    Skipped,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Result of one test
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub name: String,
    pub outcome: TestOutcome,
    /// Failure or skip reason
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl TestReport {
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::Skipped,
            message: Some(reason.into()),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }
}

/// Results of one suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Reason the class was aborted, if it was
    pub setup_error: Option<String>,
    pub tests: Vec<TestReport>,
    /// Runner states in the order they were entered
    pub states: Vec<RunnerState>,
}

impl SuiteReport {
    fn count(&self, outcome: TestOutcome) -> usize {
        self.tests.iter().filter(|test| test.outcome == outcome).count()
    }

    pub fn passed(&self) -> usize {
        self.count(TestOutcome::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(TestOutcome::Failed)
    }

    pub fn errors(&self) -> usize {
        self.count(TestOutcome::Error)
    }

    pub fn skipped(&self) -> usize {
        self.count(TestOutcome::Skipped)
    }

    /// No abort, no failure and no error
    pub fn is_success(&self) -> bool {
        self.setup_error.is_none() && self.failed() == 0 && self.errors() == 0
    }

    pub fn outcome_of(&self, test: &str) -> Option<TestOutcome> {
        self.tests.iter().find(|t| t.name == test).map(|t| t.outcome)
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed, {} errors, {} skipped in {:.2}s",
            self.suite,
            self.passed(),
            self.failed(),
            self.errors(),
            self.skipped(),
            self.duration().as_secs_f64()
        )
    }
}
