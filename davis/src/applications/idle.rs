use davis_core::{
    logging,
    process::{Process, ReceiveFn, SendFn},
    ProcessId, ProtocolViolation,
};

/// A process with no behavior of its own, used to fill interior nodes whose
/// only job is relaying. Anything delivered to it is discarded with a trace.
pub struct Idle {
    id: ProcessId,
}

impl Idle {
    pub fn new(id: ProcessId) -> Self {
        Self { id }
    }
}

impl Process for Idle {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn step(
        &mut self,
        _send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        while let Some(envelope) = receive() {
            logging::drop_event(self.id, "idle process", &envelope);
        }
        Ok(())
    }
}
