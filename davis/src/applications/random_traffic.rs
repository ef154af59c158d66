use davis_core::{
    logging,
    process::{Process, ReceiveFn, SendFn},
    Envelope, Message, ProcessId, ProtocolViolation,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Process-wide source of unique payload content. Initialized once for the
/// lifetime of the process and never reset; the mutex is the single point
/// of mutual exclusion for traffic generators on every node task.
static NEXT_PAYLOAD: Mutex<u64> = Mutex::new(0);

fn unique_content(rng: &mut SmallRng) -> String {
    let serial = {
        let mut next = NEXT_PAYLOAD.lock().unwrap();
        *next += 1;
        *next
    };
    format!("message {} ({})", serial, rng.gen_range(0..1000))
}

/// A traffic generator for exercising the fabric: each tick it randomly
/// either changes state, sends a unique message to a random peer, or drains
/// its inbox. After its tick budget is spent it keeps draining so peers'
/// messages are still counted.
pub struct RandomTraffic {
    id: ProcessId,
    peers: Vec<ProcessId>,
    remaining_ticks: u32,
    rng: SmallRng,
    received: Arc<Mutex<usize>>,
}

impl RandomTraffic {
    pub fn new(id: ProcessId, peers: Vec<ProcessId>, tick_budget: u32) -> Self {
        Self {
            id,
            peers,
            remaining_ticks: tick_budget,
            rng: SmallRng::from_entropy(),
            received: Default::default(),
        }
    }

    /// Counts received messages into the given shared counter.
    pub fn with_received_counter(mut self, received: Arc<Mutex<usize>>) -> Self {
        self.received = received;
        self
    }

    fn drain(&mut self, receive: &mut ReceiveFn) {
        while let Some(envelope) = receive() {
            logging::node_event(self.id, &format!("received {}", envelope));
            *self.received.lock().unwrap() += 1;
        }
    }
}

impl Process for RandomTraffic {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        if self.remaining_ticks == 0 {
            self.drain(receive);
            return Ok(());
        }
        self.remaining_ticks -= 1;
        match self.rng.gen_range(0..4u8) {
            0 => logging::node_event(self.id, "state change"),
            1 => {
                if !self.peers.is_empty() {
                    let peer = self.peers[self.rng.gen_range(0..self.peers.len())];
                    let content = unique_content(&mut self.rng);
                    send(Envelope::new(self.id, peer, Message::Content(content)));
                }
            }
            _ => self.drain(receive),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn payload_serials_are_unique() {
        let mut rng = SmallRng::seed_from_u64(7);
        let a = unique_content(&mut rng);
        let b = unique_content(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn drains_after_budget_is_spent() {
        let pid = ProcessId::new;
        let mut traffic = RandomTraffic::new(pid(1), vec![pid(2)], 0);
        let counter = Arc::new(Mutex::new(0));
        traffic = traffic.with_received_counter(counter.clone());

        let mut inbox = VecDeque::from([
            Envelope::new(pid(2), pid(1), Message::Content("x".into())),
            Envelope::new(pid(2), pid(1), Message::Content("y".into())),
        ]);
        traffic
            .step(&mut |_| {}, &mut || inbox.pop_front())
            .unwrap();
        assert_eq!(*counter.lock().unwrap(), 2);
    }
}
