//! The message model shared by every protocol layer.
//!
//! Messages are nested values rather than byte buffers: each layer wraps the
//! layer below it in its own kind (a transport segment carries a routed
//! envelope, a routed envelope carries application content, and so on). The
//! set of kinds is a closed enum so every layer can match exhaustively and
//! treat anything it does not expect as a
//! [`ProtocolViolation`](crate::ProtocolViolation).

use crate::{routing::NextStep, ProcessId};
use rustc_hash::FxHashMap;
use std::fmt::Display;

/// The outermost addressed wrapping of a message.
///
/// Every value that crosses a mailbox boundary is an envelope, and `from`
/// always names the node that handed it to the fabric.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The node that sent this envelope.
    pub from: ProcessId,
    /// The node this envelope is addressed to.
    pub to: ProcessId,
    /// The wrapped message.
    pub message: Message,
}

impl Envelope {
    pub fn new(from: ProcessId, to: ProcessId, message: Message) -> Self {
        Self { from, to, message }
    }
}

impl Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}) {}->{}", self.message, self.from, self.to)
    }
}

/// Every kind of message any layer in the simulation can see.
#[derive(Debug, Clone)]
pub enum Message {
    /// Application payload text.
    Content(String),
    /// An envelope being relayed hop-by-hop by the routing layer.
    Routed(Box<Envelope>),
    /// A full routing-table broadcast.
    RoutingUpdate(RoutingUpdate),
    /// A transport data segment.
    Data(DataSegment),
    /// A transport acknowledgment.
    Ack(Ack),
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Content(text) => write!(f, "\"{}\"", text),
            Message::Routed(envelope) => write!(f, "{}", envelope),
            Message::RoutingUpdate(update) => write!(f, "{}", update),
            Message::Data(segment) => write!(f, "{}", segment),
            Message::Ack(ack) => write!(f, "{}", ack),
        }
    }
}

/// A sequence number scoped to one (sender, destination) pair.
///
/// Starts at zero and increases by one per data segment enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// The sequence number following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// A routing-table broadcast carrying the sender's entire table.
#[derive(Debug, Clone)]
pub struct RoutingUpdate {
    pub next_steps: FxHashMap<ProcessId, NextStep>,
}

impl Display for RoutingUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Sorted so log lines are stable across runs.
        let mut entries: Vec<_> = self.next_steps.iter().collect();
        entries.sort_by_key(|(dest, _)| **dest);
        write!(f, "next steps: {{")?;
        for (i, (dest, step)) in entries.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", dest, step)?;
        }
        write!(f, "}}")
    }
}

/// A transport data segment: a sequence number plus the wrapped payload.
#[derive(Debug, Clone)]
pub struct DataSegment {
    pub seq: SequenceNumber,
    pub payload: Box<Message>,
}

impl Display for DataSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DATA({}, {})", self.seq, self.payload)
    }
}

/// A transport acknowledgment for a sequence number.
///
/// Acks are cumulative: acknowledging `seq` confirms every earlier sequence
/// number as well.
#[derive(Debug, Clone, Copy)]
pub struct Ack {
    pub seq: SequenceNumber,
}

impl Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ACK({})", self.seq)
    }
}
