//! Wrapper functions for the diagnostic side channel.
//!
//! Processes trace in the form `<id>: <text>`. These lines carry no
//! guarantees about ordering or completeness; they exist for humans watching
//! a run, not for the programmatic contract.

use crate::ProcessId;
use tracing::{event, Level};

/// Emits a diagnostic line on behalf of a node.
pub fn node_event(id: ProcessId, text: &str) {
    event!(target: "NODE", Level::INFO, "{}: {}", id, text);
}

/// Emits a trace for an envelope dropped by the fabric or a layer.
pub fn drop_event(id: ProcessId, reason: &str, envelope: &impl std::fmt::Display) {
    event!(target: "DROP", Level::DEBUG, "{}: dropped ({}) {}", id, reason, envelope);
}
