//! Harness test modules
//!
//! `common_utils` builds simulated device pairs and `mocks` provides mockall
//! doubles of the peer RPC interfaces. The other modules cover the sequencer,
//! the verifier, the runner, stream cancellation and configuration files.

pub mod common_utils;
#[allow(dead_code)]
pub mod mocks;

mod config_tests;
mod runner_tests;
mod sequencer_tests;
mod stream_tests;
mod verifier_tests;
