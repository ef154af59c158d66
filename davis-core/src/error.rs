//! The two fatal failure classes of the fabric and the protocol layers.
//!
//! Everything else that can go wrong at runtime (a full mailbox, a full
//! receive buffer, an unknown route, out-of-order data) is an expected
//! condition handled by silent drop and a trace event, never by an error.

use crate::ProcessId;

/// A defect in how the scenario or topology was assembled.
///
/// Configuration errors are fatal and stop the run: they indicate a
/// programming mistake, not a runtime condition.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("topology key {key} does not match the process id {actual}")]
    IdMismatch { key: ProcessId, actual: ProcessId },
    #[error("{to} is not a neighbor of {from}")]
    UnknownNeighbor { from: ProcessId, to: ProcessId },
    #[error("envelope claims sender {claimed} but was sent by {actual}")]
    ForgedSender { claimed: ProcessId, actual: ProcessId },
}

/// A message arrived somewhere its kind is never expected.
///
/// Violations mean the protocol stack was composed wrongly (layers in the
/// wrong order, or a layer missing). They are deliberately not recovered
/// from.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("{layer} cannot handle message: {message}")]
    UnexpectedMessage {
        layer: &'static str,
        message: String,
    },
    #[error("received an ack from {from} before sending it any data")]
    UnsolicitedAck { from: ProcessId },
    #[error("{layer} received a misaddressed envelope: {envelope}")]
    BadAddressing {
        layer: &'static str,
        envelope: String,
    },
    #[error("unexpected message source {from}")]
    UnexpectedSource { from: ProcessId },
}

/// Umbrella error for a simulation run.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
}
