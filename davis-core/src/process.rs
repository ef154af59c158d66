//! The [`Process`] trait, the seam every protocol layer implements.

use crate::{Envelope, ProcessId, ProtocolViolation};

/// One outbound-send capability handed to a process for the duration of a
/// single step. Offering an envelope never blocks and never reports whether
/// the envelope was actually delivered or dropped.
pub type SendFn<'a> = dyn FnMut(Envelope) + 'a;

/// One inbound-poll capability handed to a process for the duration of a
/// single step. Returns at most one pending envelope; never blocks.
pub type ReceiveFn<'a> = dyn FnMut() -> Option<Envelope> + 'a;

/// A unit of protocol logic advanced one tick at a time.
///
/// A process may be a leaf (an application) or a layer that owns an inner
/// process and delegates to it. Layers call the inner process's [`step`]
/// with their own closures so they can intercept, transform, or filter
/// everything the inner process sends and receives; they may also run side
/// logic before or after the delegated call, such as a broadcast on the
/// first tick or relay work on every tick.
///
/// [`step`]: Process::step
pub trait Process: Send + 'static {
    /// The id of the innermost concrete process. Layers forward this
    /// unchanged; wrapping never alters identity.
    fn id(&self) -> ProcessId;

    /// Advances the process by one tick.
    ///
    /// Implementations must not block: `send` and `receive` are polling
    /// operations and the fabric suspends only between ticks. Returning a
    /// [`ProtocolViolation`] is fatal to the whole run.
    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation>;
}

impl Process for Box<dyn Process> {
    fn id(&self) -> ProcessId {
        self.as_ref().id()
    }

    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        self.as_mut().step(send, receive)
    }
}
