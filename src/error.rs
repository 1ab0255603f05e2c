//! Error types for the profile harness

use std::time::Duration;

use thiserror::Error;

/// Failure of a single call into a peer's RPC interface
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// The peer did not answer
    #[error("Peer {0} is unreachable")]
    Unreachable(String),

    /// The peer does not declare the interface that was called
    #[error("Peer {peer} does not support {interface}")]
    Unsupported { peer: String, interface: &'static str },

    /// The connection cookie does not name a live link on this peer
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// A request argument was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The peer rejected the request for a profile reason
    #[error("Profile error: {0}")]
    Profile(String),
}

/// Abort of a whole test class
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    /// The testbed does not provide enough devices
    #[error("Test requires {required} devices, testbed provides {available}")]
    NotEnoughDevices { required: usize, available: usize },

    /// A role lacks a required capability
    #[error("{role} is missing required capabilities: {missing}")]
    MissingCapability { role: String, missing: String },

    /// A role has a capability the suite cannot run against
    #[error("{role} is not supported: {reason}")]
    UnsupportedRole { role: String, reason: String },

    /// Resetting a peer failed
    #[error("Failed to reset {role}: {source}")]
    Reset { role: String, source: RpcError },

    /// The suite has no test of that name
    #[error("Unknown test {0}")]
    UnknownTest(String),

    /// The reference profile service could not be configured
    #[error("Failed to configure {role}: {reason}")]
    ServiceConfiguration { role: String, reason: String },
}

/// Failure of a connection or security step
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    /// A step reported a non-success variant
    #[error("{step} reported '{variant}'")]
    FailureVariant { step: &'static str, variant: String },

    /// A step did not complete in time
    #[error("{step} timed out after {timeout:?}")]
    Timeout { step: &'static str, timeout: Duration },

    /// A stream ended before yielding the awaited event
    #[error("{0} stream ended before yielding a result")]
    StreamEnded(&'static str),

    /// The two sides of a link do not resolve to the same link
    #[error("Connection sides disagree: {0}")]
    AsymmetricConnection(String),

    /// An RPC call failed while sequencing
    #[error("{step} failed: {source}")]
    Rpc { step: &'static str, source: RpcError },

    /// A role was asked to play the wrong side of the link
    #[error("{role} cannot act as {expected}")]
    RoleMismatch { role: String, expected: &'static str },

    /// Data returned by the peer could not be converted
    #[error("Invalid data from peer: {0}")]
    InvalidData(String),
}

/// Mismatch between retrieved and expected profile state
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{what} mismatch\nexpected: {expected}\n  actual: {actual}")]
pub struct AssertionFailure {
    pub what: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionFailure {
    /// Build a failure from the `Debug` forms of both values
    pub fn new<E, A>(what: impl Into<String>, expected: &E, actual: &A) -> Self
    where
        E: std::fmt::Debug + ?Sized,
        A: std::fmt::Debug + ?Sized,
    {
        Self {
            what: what.into(),
            expected: format!("{:#?}", expected),
            actual: format!("{:#?}", actual),
        }
    }
}

/// Broad category of a harness failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Aborts the whole class
    Setup,
    /// Aborts the current test
    Sequence,
    /// Fails the current test
    Assertion,
}

/// Harness error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error("Setup aborted: {0}")]
    Setup(#[from] SetupError),

    #[error("Sequence failed: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionFailure),
}

impl HarnessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Setup(_) => ErrorCategory::Setup,
            Self::Sequence(_) => ErrorCategory::Sequence,
            Self::Assertion(_) => ErrorCategory::Assertion,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HarnessError>;
