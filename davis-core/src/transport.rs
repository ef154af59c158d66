//! The reliable transport layer.
//!
//! A [`ReliableTransport`] wraps an inner process and gives it ordered,
//! acknowledged delivery to and from each peer, with per-peer state created
//! lazily on first contact. The mechanics are a deliberately small TCP:
//! every still-unacknowledged segment is re-offered to the fabric on every
//! tick (no window, no retransmission timer), acknowledgments are
//! cumulative, and the receive side accepts segments strictly in order into
//! a bounded buffer.

use crate::{
    logging,
    message::{Ack, DataSegment},
    process::{Process, ReceiveFn, SendFn},
    Envelope, Message, ProcessId, ProtocolViolation,
};
use std::collections::{BTreeMap, VecDeque};

/// How many accepted segments an inbound sub-process may hold before it
/// stops acknowledging new ones.
pub const RECEIVE_BUFFER_CAPACITY: usize = 5;

const LAYER: &str = "transport";

/// The sending half of one peer connection: everything enqueued but not yet
/// acknowledged, tagged with the sequence assigned at enqueue time.
struct Outbound {
    owner: ProcessId,
    dest: ProcessId,
    pending: VecDeque<DataSegment>,
    next_seq: crate::SequenceNumber,
    input: VecDeque<Envelope>,
}

impl Outbound {
    fn new(owner: ProcessId, dest: ProcessId) -> Self {
        Self {
            owner,
            dest,
            pending: VecDeque::new(),
            next_seq: Default::default(),
            input: VecDeque::new(),
        }
    }

    /// Tags a payload with the next sequence number and queues it. The
    /// pending queue is unbounded; backpressure is the receiver's silence.
    fn enqueue(&mut self, payload: Message) {
        self.pending.push_back(DataSegment {
            seq: self.next_seq,
            payload: Box::new(payload),
        });
        self.next_seq = self.next_seq.next();
    }

    /// One tick: blindly re-offer everything pending, then consume at most
    /// one dispatched acknowledgment.
    fn pump(&mut self, send: &mut SendFn) -> Result<(), ProtocolViolation> {
        for segment in &self.pending {
            send(Envelope::new(
                self.owner,
                self.dest,
                Message::Data(segment.clone()),
            ));
        }
        let Some(received) = self.input.pop_front() else {
            return Ok(());
        };
        if received.to != self.owner || received.from != self.dest {
            return Err(ProtocolViolation::BadAddressing {
                layer: LAYER,
                envelope: received.to_string(),
            });
        }
        match received.message {
            Message::Ack(ack) => {
                // Cumulative: the acked sequence confirms every earlier one.
                while matches!(self.pending.front(), Some(segment) if segment.seq <= ack.seq) {
                    self.pending.pop_front();
                }
                Ok(())
            }
            other => Err(ProtocolViolation::UnexpectedMessage {
                layer: LAYER,
                message: other.to_string(),
            }),
        }
    }
}

/// The receiving half of one peer connection: a bounded in-order buffer and
/// the next sequence number it will accept.
struct Inbound {
    owner: ProcessId,
    source: ProcessId,
    buffer: VecDeque<Message>,
    next_seq: crate::SequenceNumber,
    input: VecDeque<Envelope>,
}

impl Inbound {
    fn new(owner: ProcessId, source: ProcessId) -> Self {
        Self {
            owner,
            source,
            buffer: VecDeque::new(),
            next_seq: Default::default(),
            input: VecDeque::new(),
        }
    }

    /// One tick: consume at most one dispatched data segment. Only the
    /// exactly-expected sequence is accepted, and only if the buffer has
    /// room; everything else is dropped without an acknowledgment, so the
    /// sender's blind resend covers gaps, overflow, and duplicates alike.
    fn pump(&mut self, send: &mut SendFn) -> Result<(), ProtocolViolation> {
        let Some(received) = self.input.pop_front() else {
            return Ok(());
        };
        if received.to != self.owner || received.from != self.source {
            return Err(ProtocolViolation::BadAddressing {
                layer: LAYER,
                envelope: received.to_string(),
            });
        }
        match received.message {
            Message::Data(segment) => {
                if segment.seq != self.next_seq {
                    logging::drop_event(self.owner, "out of order", &segment);
                    return Ok(());
                }
                if self.buffer.len() >= RECEIVE_BUFFER_CAPACITY {
                    logging::drop_event(self.owner, "receive buffer full", &segment);
                    return Ok(());
                }
                let seq = segment.seq;
                self.buffer.push_back(*segment.payload);
                self.next_seq = self.next_seq.next();
                send(Envelope::new(
                    self.owner,
                    self.source,
                    Message::Ack(Ack { seq }),
                ));
                Ok(())
            }
            other => Err(ProtocolViolation::UnexpectedMessage {
                layer: LAYER,
                message: other.to_string(),
            }),
        }
    }
}

/// A process layer providing reliable delivery to its inner process,
/// independently per peer.
pub struct ReliableTransport {
    inner: Box<dyn Process>,
    id: ProcessId,
    // BTreeMaps so the pump order and the inner-receive scan are stable.
    outbound: BTreeMap<ProcessId, Outbound>,
    inbound: BTreeMap<ProcessId, Inbound>,
}

impl ReliableTransport {
    pub fn new(inner: Box<dyn Process>) -> Self {
        let id = inner.id();
        Self {
            inner,
            id,
            outbound: BTreeMap::new(),
            inbound: BTreeMap::new(),
        }
    }

    /// Delegates one tick to the inner process. Inner sends are enqueued on
    /// the outbound connection for their destination (opened lazily); inner
    /// receives take the oldest buffered payload from the first inbound
    /// connection holding one, addressed from its original source.
    fn inner_step(&mut self, _send: &mut SendFn) -> Result<(), ProtocolViolation> {
        let Self {
            inner,
            id,
            outbound,
            inbound,
        } = self;
        let id = *id;
        let mut inner_send = |envelope: Envelope| {
            outbound
                .entry(envelope.to)
                .or_insert_with(|| Outbound::new(id, envelope.to))
                .enqueue(envelope.message);
        };
        let mut inner_receive = || {
            for (&source, connection) in inbound.iter_mut() {
                if let Some(payload) = connection.buffer.pop_front() {
                    return Some(Envelope::new(source, id, payload));
                }
            }
            None
        };
        inner.step(&mut inner_send, &mut inner_receive)
    }
}

impl Process for ReliableTransport {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        // Dispatch: drain everything the tick delivered, splitting it to the
        // per-peer halves. An ack can only follow data this node sent, so an
        // ack from an unknown peer means the stack is miswired.
        while let Some(received) = receive() {
            match &received.message {
                Message::Ack(_) => {
                    let Some(connection) = self.outbound.get_mut(&received.from) else {
                        return Err(ProtocolViolation::UnsolicitedAck {
                            from: received.from,
                        });
                    };
                    connection.input.push_back(received);
                }
                Message::Data(_) => {
                    let id = self.id;
                    let source = received.from;
                    self.inbound
                        .entry(source)
                        .or_insert_with(|| Inbound::new(id, source))
                        .input
                        .push_back(received);
                }
                other => {
                    return Err(ProtocolViolation::UnexpectedMessage {
                        layer: LAYER,
                        message: other.to_string(),
                    })
                }
            }
        }

        for connection in self.outbound.values_mut() {
            connection.pump(send)?;
        }
        for connection in self.inbound.values_mut() {
            connection.pump(send)?;
        }
        self.inner_step(send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequenceNumber;
    use std::sync::{Arc, Mutex};

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    fn seq(n: u64) -> SequenceNumber {
        SequenceNumber::new(n)
    }

    fn data(from: u64, to: u64, n: u64, text: &str) -> Envelope {
        Envelope::new(
            pid(from),
            pid(to),
            Message::Data(DataSegment {
                seq: seq(n),
                payload: Box::new(Message::Content(text.into())),
            }),
        )
    }

    fn ack(from: u64, to: u64, n: u64) -> Envelope {
        Envelope::new(pid(from), pid(to), Message::Ack(Ack { seq: seq(n) }))
    }

    fn pending_seqs(connection: &Outbound) -> Vec<SequenceNumber> {
        connection.pending.iter().map(|segment| segment.seq).collect()
    }

    #[test]
    fn cumulative_ack_discards_prefix() {
        let mut connection = Outbound::new(pid(1), pid(8));
        for text in ["a", "b", "c", "d"] {
            connection.enqueue(Message::Content(text.into()));
        }
        connection.input.push_back(ack(8, 1, 2));

        let mut sent = Vec::new();
        connection.pump(&mut |e| sent.push(e)).unwrap();

        // All four were still pending, so all four went on the wire.
        assert_eq!(sent.len(), 4);
        assert_eq!(pending_seqs(&connection), vec![seq(3)]);
    }

    #[test]
    fn pending_resends_every_tick_until_acked() {
        let mut connection = Outbound::new(pid(1), pid(8));
        connection.enqueue(Message::Content("a".into()));

        for _ in 0..3 {
            let mut sent = Vec::new();
            connection.pump(&mut |e| sent.push(e)).unwrap();
            assert_eq!(sent.len(), 1);
        }
        connection.input.push_back(ack(8, 1, 0));
        connection.pump(&mut |_| {}).unwrap();
        assert!(connection.pending.is_empty());
    }

    #[test]
    fn in_order_only_acceptance() {
        let mut connection = Inbound::new(pid(8), pid(1));
        connection.next_seq = seq(3);

        // A future sequence is dropped with no ack.
        connection.input.push_back(data(1, 8, 5, "early"));
        let mut sent = Vec::new();
        connection.pump(&mut |e| sent.push(e)).unwrap();
        assert!(sent.is_empty());
        assert!(connection.buffer.is_empty());

        // The expected sequence is accepted and acknowledged.
        connection.input.push_back(data(1, 8, 3, "on time"));
        connection.pump(&mut |e| sent.push(e)).unwrap();
        assert_eq!(connection.buffer.len(), 1);
        assert_eq!(sent.len(), 1);
        match &sent[0].message {
            Message::Ack(ack) => assert_eq!(ack.seq, seq(3)),
            other => panic!("expected an ack, got {}", other),
        }
    }

    #[test]
    fn receive_buffer_is_bounded() {
        let mut connection = Inbound::new(pid(8), pid(1));
        let mut acks = 0;
        for n in 0..6 {
            connection.input.push_back(data(1, 8, n, "x"));
            connection.pump(&mut |_| acks += 1).unwrap();
        }
        // Five accepted and acknowledged, the sixth dropped without an ack.
        assert_eq!(connection.buffer.len(), RECEIVE_BUFFER_CAPACITY);
        assert_eq!(acks, RECEIVE_BUFFER_CAPACITY);
        assert_eq!(connection.next_seq, seq(5));
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let mut connection = Inbound::new(pid(8), pid(1));
        let mut acks = 0;
        connection.input.push_back(data(1, 8, 0, "once"));
        connection.pump(&mut |_| acks += 1).unwrap();
        connection.input.push_back(data(1, 8, 0, "once"));
        connection.pump(&mut |_| acks += 1).unwrap();

        assert_eq!(connection.buffer.len(), 1);
        assert_eq!(acks, 1);
    }

    #[test]
    fn unsolicited_ack_is_a_violation() {
        let mut transport = ReliableTransport::new(Box::new(Mute { id: pid(1) }));
        let mut inbox = VecDeque::from([ack(8, 1, 0)]);
        let result = transport.step(&mut |_| {}, &mut || inbox.pop_front());
        assert!(matches!(
            result,
            Err(ProtocolViolation::UnsolicitedAck { from }) if from == pid(8)
        ));
    }

    #[test]
    fn raw_content_on_the_wire_is_a_violation() {
        let mut transport = ReliableTransport::new(Box::new(Mute { id: pid(1) }));
        let stray = Envelope::new(pid(8), pid(1), Message::Content("raw".into()));
        let mut inbox = VecDeque::from([stray]);
        let result = transport.step(&mut |_| {}, &mut || inbox.pop_front());
        assert!(matches!(
            result,
            Err(ProtocolViolation::UnexpectedMessage { .. })
        ));
    }

    /// An inner process that neither sends nor receives.
    struct Mute {
        id: ProcessId,
    }

    impl Process for Mute {
        fn id(&self) -> ProcessId {
            self.id
        }

        fn step(
            &mut self,
            _send: &mut SendFn,
            _receive: &mut ReceiveFn,
        ) -> Result<(), ProtocolViolation> {
            Ok(())
        }
    }

    /// An inner process that sends one message to a peer on its first tick.
    struct SendOnce {
        id: ProcessId,
        peer: ProcessId,
        sent: bool,
    }

    impl Process for SendOnce {
        fn id(&self) -> ProcessId {
            self.id
        }

        fn step(
            &mut self,
            send: &mut SendFn,
            _receive: &mut ReceiveFn,
        ) -> Result<(), ProtocolViolation> {
            if !self.sent {
                send(Envelope::new(
                    self.id,
                    self.peer,
                    Message::Content("hello".into()),
                ));
                self.sent = true;
            }
            Ok(())
        }
    }

    /// An inner process that records everything handed to its receive.
    struct Collect {
        id: ProcessId,
        seen: Arc<Mutex<Vec<Envelope>>>,
    }

    impl Process for Collect {
        fn id(&self) -> ProcessId {
            self.id
        }

        fn step(
            &mut self,
            _send: &mut SendFn,
            receive: &mut ReceiveFn,
        ) -> Result<(), ProtocolViolation> {
            while let Some(envelope) = receive() {
                self.seen.lock().unwrap().push(envelope);
            }
            Ok(())
        }
    }

    /// Steps a transport with a scripted inbox, returning what it sent.
    fn step_with(transport: &mut ReliableTransport, inbox: Vec<Envelope>) -> Vec<Envelope> {
        let mut inbox: VecDeque<_> = inbox.into();
        let mut sent = Vec::new();
        transport
            .step(&mut |e| sent.push(e), &mut || inbox.pop_front())
            .unwrap();
        sent
    }

    #[test]
    fn end_to_end_with_lazy_connections() {
        let mut sender = ReliableTransport::new(Box::new(SendOnce {
            id: pid(1),
            peer: pid(8),
            sent: false,
        }));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut receiver = ReliableTransport::new(Box::new(Collect {
            id: pid(8),
            seen: seen.clone(),
        }));

        // Tick 1: the inner send opens the outbound connection lazily; the
        // segment goes on the wire on the next tick.
        assert!(step_with(&mut sender, vec![]).is_empty());
        let wire = step_with(&mut sender, vec![]);
        assert_eq!(wire.len(), 1);

        // The receiver accepts, acks, and hands the payload inward.
        let acks = step_with(&mut receiver, wire);
        assert_eq!(acks.len(), 1);
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].from, pid(1));
            assert_eq!(seen[0].to, pid(8));
        }

        // Pending is re-offered once more on the tick that consumes the
        // ack, then the queue is empty and the wire goes quiet.
        assert_eq!(step_with(&mut sender, acks).len(), 1);
        assert!(step_with(&mut sender, vec![]).is_empty());
    }
}
