//! The distance-vector routing layer.
//!
//! A [`DistanceVector`] wraps an inner process and a fixed one-hop neighbor
//! set. It learns shortest paths to every reachable process by exchanging
//! full routing tables with its neighbors (Bellman-Ford relaxation) and
//! relays the inner process's messages hop-by-hop along the learned routes.
//! Routing is best-effort: until the tables converge, payload messages with
//! no known route are dropped and logged.

use crate::{
    logging,
    message::RoutingUpdate,
    process::{Process, ReceiveFn, SendFn},
    Envelope, Message, ProcessId, ProtocolViolation,
};
use rustc_hash::FxHashMap;
use std::{
    collections::{BTreeSet, VecDeque},
    fmt::Display,
    sync::{Arc, Mutex},
};

/// How many payload envelopes addressed to this node may wait for the inner
/// process before new arrivals are dropped.
const DELIVERY_QUEUE_CAPACITY: usize = 1000;

const LAYER: &str = "distance-vector";

/// One routing-table entry: the neighbor to forward through and the known
/// hop count to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStep {
    pub stepping_stone: ProcessId,
    pub total_distance: u32,
}

impl Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} hops via {}", self.total_distance, self.stepping_stone)
    }
}

/// A cloneable view of a node's routing table, for inspection after a run.
/// Mutated only by the owning layer while the cluster is running.
pub type RoutingTable = Arc<Mutex<FxHashMap<ProcessId, NextStep>>>;

/// A process layer that routes its inner process's messages across a
/// partially connected topology.
pub struct DistanceVector {
    inner: Box<dyn Process>,
    id: ProcessId,
    neighbors: BTreeSet<ProcessId>,
    table: RoutingTable,
    delivery_queue: VecDeque<Envelope>,
    started: bool,
}

impl DistanceVector {
    /// Wraps `inner`, seeding the routing table with the self entry.
    pub fn new(
        inner: Box<dyn Process>,
        neighbors: impl IntoIterator<Item = ProcessId>,
    ) -> Self {
        let id = inner.id();
        let mut table = FxHashMap::default();
        table.insert(
            id,
            NextStep {
                stepping_stone: id,
                total_distance: 0,
            },
        );
        Self {
            inner,
            id,
            neighbors: neighbors.into_iter().collect(),
            table: Arc::new(Mutex::new(table)),
            delivery_queue: VecDeque::new(),
            started: false,
        }
    }

    /// A handle to this node's routing table.
    pub fn table_handle(&self) -> RoutingTable {
        self.table.clone()
    }

    /// Sends the whole table to every neighbor.
    fn broadcast(&self, send: &mut SendFn) {
        let snapshot = self.table.lock().unwrap().clone();
        for &neighbor in &self.neighbors {
            send(Envelope::new(
                self.id,
                neighbor,
                Message::RoutingUpdate(RoutingUpdate {
                    next_steps: snapshot.clone(),
                }),
            ));
        }
    }

    /// Relaxes the table against a neighbor's broadcast. Returns whether any
    /// entry changed. Ties keep the incumbent stepping stone so equal-cost
    /// paths never oscillate.
    fn update(&mut self, update: RoutingUpdate, from: ProcessId) -> bool {
        let mut table = self.table.lock().unwrap();
        let mut changed = false;
        for (dest, step) in update.next_steps {
            let candidate = step.total_distance + 1;
            let improves = match table.get(&dest) {
                Some(known) => known.total_distance > candidate,
                None => true,
            };
            if improves {
                table.insert(
                    dest,
                    NextStep {
                        stepping_stone: from,
                        total_distance: candidate,
                    },
                );
                changed = true;
            }
        }
        changed
    }

    /// Forwards a payload envelope toward its destination's stepping stone,
    /// or drops it if no route is known yet.
    fn relay(&self, envelope: Envelope, send: &mut SendFn) {
        let step = self.table.lock().unwrap().get(&envelope.to).copied();
        match step {
            Some(step) => send(Envelope::new(
                self.id,
                step.stepping_stone,
                Message::Routed(Box::new(envelope)),
            )),
            None => logging::node_event(self.id, &format!("unable to deliver message {}", envelope)),
        }
    }

    /// The layer's own work for one tick: the startup broadcast, then one
    /// received envelope classified as either a routing update or a payload.
    /// The layer polls even when the inner process would not, so updates are
    /// consumed as they arrive; payloads for this node wait in the delivery
    /// queue until the inner process asks for them.
    fn layer_step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        if !self.started {
            self.broadcast(send);
            self.started = true;
        }
        let Some(received) = receive() else {
            return Ok(());
        };
        match received.message {
            Message::RoutingUpdate(update) => {
                if self.update(update, received.from) {
                    self.broadcast(send);
                }
                Ok(())
            }
            Message::Routed(envelope) => {
                let envelope = *envelope;
                if envelope.to == self.id {
                    if self.delivery_queue.len() >= DELIVERY_QUEUE_CAPACITY {
                        logging::drop_event(self.id, "delivery queue full", &envelope);
                    } else {
                        self.delivery_queue.push_back(envelope);
                    }
                } else {
                    self.relay(envelope, send);
                }
                Ok(())
            }
            other => Err(ProtocolViolation::UnexpectedMessage {
                layer: LAYER,
                message: other.to_string(),
            }),
        }
    }

    /// Delegates one tick to the inner process, wrapping its sends toward
    /// the stepping stone for their destination and feeding its receives
    /// from the delivery queue.
    fn inner_step(&mut self, send: &mut SendFn) -> Result<(), ProtocolViolation> {
        let Self {
            inner,
            id,
            table,
            delivery_queue,
            ..
        } = self;
        let id = *id;
        let mut inner_send = |envelope: Envelope| {
            let step = table.lock().unwrap().get(&envelope.to).copied();
            match step {
                Some(step) => send(Envelope::new(
                    id,
                    step.stepping_stone,
                    Message::Routed(Box::new(envelope)),
                )),
                None => {
                    logging::node_event(id, &format!("unable to deliver message {}", envelope))
                }
            }
        };
        let mut inner_receive = || delivery_queue.pop_front();
        inner.step(&mut inner_send, &mut inner_receive)
    }
}

impl Process for DistanceVector {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        self.layer_step(send, receive)?;
        self.inner_step(send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// An inner process that does nothing on its own.
    struct Quiet {
        id: ProcessId,
    }

    impl Process for Quiet {
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

    /// An inner process that records everything handed to its receive.
    struct Recorder {
        id: ProcessId,
        seen: Arc<Mutex<Vec<Envelope>>>,
    }

    impl Process for Recorder {
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

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    fn quiet_layer(id: u64, neighbors: &[u64]) -> DistanceVector {
        DistanceVector::new(
            Box::new(Quiet { id: pid(id) }),
            neighbors.iter().map(|&n| pid(n)),
        )
    }

    fn update_from(from: u64, entries: &[(u64, u64, u32)]) -> Envelope {
        // entries: (dest, stepping stone, distance) as known by `from`
        let next_steps = entries
            .iter()
            .map(|&(dest, via, dist)| {
                (
                    pid(dest),
                    NextStep {
                        stepping_stone: pid(via),
                        total_distance: dist,
                    },
                )
            })
            .collect();
        Envelope::new(
            pid(from),
            pid(1),
            Message::RoutingUpdate(RoutingUpdate { next_steps }),
        )
    }

    /// Steps the layer once with a scripted inbox, collecting sends.
    fn step_with(
        layer: &mut DistanceVector,
        inbox: Vec<Envelope>,
    ) -> Result<Vec<Envelope>, ProtocolViolation> {
        let mut inbox: VecDeque<_> = inbox.into();
        let mut sent = Vec::new();
        let mut send = |envelope: Envelope| sent.push(envelope);
        let mut receive = || inbox.pop_front();
        layer.step(&mut send, &mut receive)?;
        Ok(sent)
    }

    #[test]
    fn first_step_broadcasts_to_every_neighbor() {
        let mut layer = quiet_layer(1, &[2, 4, 7]);
        let sent = step_with(&mut layer, vec![]).unwrap();
        let targets: Vec<_> = sent.iter().map(|e| e.to).collect();
        assert_eq!(targets, vec![pid(2), pid(4), pid(7)]);
        for envelope in &sent {
            assert_eq!(envelope.from, pid(1));
            assert!(matches!(envelope.message, Message::RoutingUpdate(_)));
        }
        // The unconditional broadcast happens only once.
        assert!(step_with(&mut layer, vec![]).unwrap().is_empty());
    }

    #[test]
    fn improvement_updates_and_rebroadcasts() {
        let mut layer = quiet_layer(1, &[2]);
        step_with(&mut layer, vec![]).unwrap();

        let sent = step_with(&mut layer, vec![update_from(2, &[(9, 9, 1)])]).unwrap();
        assert!(!sent.is_empty(), "a change must trigger a re-broadcast");
        let table = layer.table_handle();
        let entry = table.lock().unwrap()[&pid(9)];
        assert_eq!(
            entry,
            NextStep {
                stepping_stone: pid(2),
                total_distance: 2
            }
        );
    }

    #[test]
    fn equal_distance_keeps_incumbent_and_stays_silent() {
        let mut layer = quiet_layer(1, &[2, 3]);
        step_with(&mut layer, vec![]).unwrap();
        step_with(&mut layer, vec![update_from(2, &[(9, 9, 1)])]).unwrap();

        // Same distance through a different neighbor: no change, no traffic.
        let sent = step_with(&mut layer, vec![update_from(3, &[(9, 9, 1)])]).unwrap();
        assert!(sent.is_empty());
        let table = layer.table_handle();
        let entry = table.lock().unwrap()[&pid(9)];
        assert_eq!(entry.stepping_stone, pid(2));
        assert_eq!(entry.total_distance, 2);
    }

    #[test]
    fn payload_for_self_reaches_the_inner_process() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut layer = DistanceVector::new(
            Box::new(Recorder {
                id: pid(1),
                seen: seen.clone(),
            }),
            [pid(2)],
        );
        let payload = Envelope::new(pid(8), pid(1), Message::Content("hi".into()));
        let wrapped = Envelope::new(pid(2), pid(1), Message::Routed(Box::new(payload)));
        step_with(&mut layer, vec![wrapped]).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].from, pid(8));
        assert_eq!(seen[0].to, pid(1));
    }

    #[test]
    fn payload_for_other_is_relayed_via_stepping_stone() {
        let mut layer = quiet_layer(5, &[4, 6]);
        step_with(&mut layer, vec![]).unwrap();
        // Learn a route to 8 through 6.
        step_with(&mut layer, vec![update_from(6, &[(8, 8, 1)])]).unwrap();

        let payload = Envelope::new(pid(1), pid(8), Message::Content("hi".into()));
        let wrapped = Envelope::new(pid(4), pid(5), Message::Routed(Box::new(payload)));
        let sent = step_with(&mut layer, vec![wrapped]).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, pid(5));
        assert_eq!(sent[0].to, pid(6));
        match &sent[0].message {
            Message::Routed(inner) => assert_eq!(inner.to, pid(8)),
            other => panic!("expected a routed envelope, got {}", other),
        }
    }

    #[test]
    fn unroutable_payload_is_dropped_not_fatal() {
        let mut layer = quiet_layer(5, &[4]);
        step_with(&mut layer, vec![]).unwrap();
        let payload = Envelope::new(pid(1), pid(8), Message::Content("hi".into()));
        let wrapped = Envelope::new(pid(4), pid(5), Message::Routed(Box::new(payload)));
        let sent = step_with(&mut layer, vec![wrapped]).unwrap();
        assert!(sent.is_empty());
    }

    #[test]
    fn unexpected_kind_is_a_violation() {
        let mut layer = quiet_layer(1, &[2]);
        step_with(&mut layer, vec![]).unwrap();
        let stray = Envelope::new(pid(2), pid(1), Message::Content("raw".into()));
        assert!(matches!(
            step_with(&mut layer, vec![stray]),
            Err(ProtocolViolation::UnexpectedMessage { .. })
        ));
    }
}
