//! The fabric-side wrapper that gives one process real mailboxes.

use crate::{
    error::{ConfigurationError, SimError},
    logging, Envelope, Process, ProcessId,
};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

/// How many envelopes a node's inbound mailbox can hold before the fabric
/// starts dropping new arrivals.
pub const MAILBOX_CAPACITY: usize = 1000;

/// A process wired into a cluster: its inbound mailbox plus a sender for
/// each neighbor's mailbox. The node drives the process one tick at a time
/// with closures backed by those queues.
pub(crate) struct Node {
    id: ProcessId,
    process: Box<dyn Process>,
    inbox: mpsc::Receiver<Envelope>,
    outbound: FxHashMap<ProcessId, mpsc::Sender<Envelope>>,
}

impl Node {
    pub(crate) fn new(
        process: Box<dyn Process>,
        inbox: mpsc::Receiver<Envelope>,
        outbound: FxHashMap<ProcessId, mpsc::Sender<Envelope>>,
    ) -> Self {
        Self {
            id: process.id(),
            process,
            inbox,
            outbound,
        }
    }

    pub(crate) fn id(&self) -> ProcessId {
        self.id
    }

    /// Runs one step of the wrapped process against the real mailboxes.
    ///
    /// Sending to a non-neighbor or with a forged `from` field is a
    /// configuration error; since the send capability reports nothing to its
    /// caller, the fault is recorded aside and surfaced as this tick's
    /// result. A full destination mailbox drops the envelope silently.
    pub(crate) fn tick(&mut self) -> Result<(), SimError> {
        let Self {
            id,
            process,
            inbox,
            outbound,
        } = self;
        let id = *id;
        let mut fault: Option<ConfigurationError> = None;

        let mut send = |envelope: Envelope| {
            if fault.is_some() {
                return;
            }
            if envelope.from != id {
                fault = Some(ConfigurationError::ForgedSender {
                    claimed: envelope.from,
                    actual: id,
                });
                return;
            }
            let Some(mailbox) = outbound.get(&envelope.to) else {
                fault = Some(ConfigurationError::UnknownNeighbor {
                    from: id,
                    to: envelope.to,
                });
                return;
            };
            match mailbox.try_send(envelope) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(envelope)) => {
                    logging::drop_event(id, "mailbox full", &envelope);
                }
                // The receiving node has already stopped; nothing to do.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        };
        let mut receive = || inbox.try_recv().ok();

        process.step(&mut send, &mut receive)?;
        match fault {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }
}
