use davis_core::{
    logging,
    process::{Process, ReceiveFn, SendFn},
    Envelope, ProcessId, ProtocolViolation,
};
use std::sync::{Arc, Mutex};

/// A layer that stamps a Lamport-style logical time on its inner process's
/// traffic: the clock advances by one on every send and every receive, and
/// the stamped time is traced alongside the envelope. The clock travels in
/// the diagnostic channel only; no wire header is added, so the layer is
/// transparent to everything below it.
pub struct LamportClock {
    inner: Box<dyn Process>,
    id: ProcessId,
    clock: Arc<Mutex<u64>>,
}

impl LamportClock {
    pub fn new(inner: Box<dyn Process>) -> Self {
        let id = inner.id();
        Self {
            inner,
            id,
            clock: Arc::new(Mutex::new(0)),
        }
    }

    /// A handle to this node's logical clock, for inspection after a run.
    pub fn clock_handle(&self) -> Arc<Mutex<u64>> {
        self.clock.clone()
    }
}

impl Process for LamportClock {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        let Self { inner, id, clock } = self;
        let id = *id;
        let mut clocked_send = |envelope: Envelope| {
            let time = {
                let mut clock = clock.lock().unwrap();
                *clock += 1;
                *clock
            };
            logging::node_event(id, &format!("T{} send {}", time, envelope));
            send(envelope);
        };
        let mut clocked_receive = || {
            let envelope = receive()?;
            let time = {
                let mut clock = clock.lock().unwrap();
                *clock += 1;
                *clock
            };
            logging::node_event(id, &format!("T{} recv {}", time, envelope));
            Some(envelope)
        };
        inner.step(&mut clocked_send, &mut clocked_receive)
    }
}
