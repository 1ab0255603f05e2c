// Root module exports
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod profiles;
pub mod sim;
pub mod suites;

// Re-exports for convenience
pub use config::{HarnessConfig, SequencerConfig, TestbedConfig};
pub use error::{AssertionFailure, ErrorCategory, HarnessError, Result, RpcError, SequenceError, SetupError};
pub use harness::{
    ConnectionPair, DeviceRole, ProfileVerifier, ScanFilter, Sequencer, SimTestbed, SuiteReport, TestOutcome,
    TestRunner, TestSuite, Testbed,
};
pub use logging::configure_logging;
pub use sim::{SimDevice, SimulatedAir};
