//! Profile conformance harness
//!
//! Device roles are handed out by a [`Testbed`], connected and paired by the
//! [`Sequencer`], checked by the [`ProfileVerifier`] and driven per test by
//! the [`TestRunner`].

pub mod device;
pub mod report;
pub mod runner;
pub mod sequencer;
pub mod testbed;
pub mod verifier;

pub use device::{Capabilities, DeviceDescriptor, DeviceRole, FilteredScan, LinkRole, ScanFilter};
pub use report::{SuiteReport, TestOutcome, TestReport};
pub use runner::{reset_all, RunnerState, TestRunner, TestSuite};
pub use sequencer::{ConnectionPair, Sequencer, CENTRAL_OWN_ADDRESS_TYPE};
pub use testbed::{generated_address, SimTestbed, Testbed};
pub use verifier::{compare_presets, ProfileVerifier};
