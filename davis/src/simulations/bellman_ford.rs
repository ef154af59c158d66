use crate::applications::{Conversation, Idle, Transcript};
use davis_core::{
    run_scenario_with_timeout,
    routing::{DistanceVector, RoutingTable},
    shutdown::{ExitStatus, Shutdown},
    Process, ProcessId, ReliableTransport, Scenario, Topology, TopologyNode,
};
use std::{
    collections::VecDeque,
    sync::Mutex,
    time::Duration,
};

/// The 8-node diamond:
///
/// ```text
///     2  -  3
///   /         \
/// 1 - 4 - 5 - 6 - 8
///   \     |     /
///     -   7   -
/// ```
///
/// Node 1 holds a conversation with node 8 across the relays.
const ADJACENCY: [(u64, &[u64]); 8] = [
    (1, &[2, 4, 7]),
    (2, &[1, 3]),
    (3, &[2, 6]),
    (4, &[1, 5]),
    (5, &[4, 6, 7]),
    (6, &[3, 5, 8]),
    (7, &[1, 5, 8]),
    (8, &[6, 7]),
];

/// A conversation between the two far corners of the diamond, with every
/// node stacked as routing over transport over its application, so phrases
/// are delivered reliably end-to-end across whatever routes converge.
pub struct BellmanFordScenario {
    shutdown: Shutdown,
    initiator_transcript: Transcript,
    responder_transcript: Transcript,
    tables: Mutex<Vec<(ProcessId, RoutingTable)>>,
}

impl BellmanFordScenario {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            shutdown,
            initiator_transcript: Default::default(),
            responder_transcript: Default::default(),
            tables: Mutex::new(Vec::new()),
        }
    }

    /// Phrases node 1 heard from node 8.
    pub fn initiator_transcript(&self) -> Transcript {
        self.initiator_transcript.clone()
    }

    /// Phrases node 8 heard from node 1.
    pub fn responder_transcript(&self) -> Transcript {
        self.responder_transcript.clone()
    }

    /// Every node's routing table, captured during the last `network` call.
    pub fn tables(&self) -> Vec<(ProcessId, RoutingTable)> {
        self.tables.lock().unwrap().clone()
    }
}

impl Scenario for BellmanFordScenario {
    fn network(&self) -> Topology {
        let mut tables = self.tables.lock().unwrap();
        tables.clear();

        let mut topology = Topology::new();
        for (id, neighbors) in ADJACENCY {
            let id = ProcessId::new(id);
            let neighbors = neighbors.iter().map(|&n| ProcessId::new(n));
            let application: Box<dyn Process> = match id.into_inner() {
                1 => Box::new(
                    Conversation::new(id, ProcessId::new(8), ["hi there", "what's up"], true)
                        .with_transcript(self.initiator_transcript.clone())
                        .with_shutdown(self.shutdown.clone()),
                ),
                8 => Box::new(
                    Conversation::new(id, ProcessId::new(1), ["hi", "all good"], false)
                        .with_transcript(self.responder_transcript.clone()),
                ),
                _ => Box::new(Idle::new(id)),
            };
            let transport = ReliableTransport::new(application);
            let routing = DistanceVector::new(Box::new(transport), neighbors.clone());
            tables.push((id, routing.table_handle()));
            topology.insert(id, TopologyNode::new(Box::new(routing), neighbors));
        }
        topology
    }
}

/// True shortest hop count between two nodes of the diamond.
fn shortest_hops(from: u64, to: u64) -> u32 {
    let neighbors = |id: u64| -> &[u64] {
        ADJACENCY
            .iter()
            .find(|(node, _)| *node == id)
            .map(|(_, neighbors)| *neighbors)
            .unwrap()
    };
    let mut distances = std::collections::BTreeMap::from([(from, 0u32)]);
    let mut frontier = VecDeque::from([from]);
    while let Some(node) = frontier.pop_front() {
        let distance = distances[&node];
        if node == to {
            return distance;
        }
        for &next in neighbors(node) {
            if !distances.contains_key(&next) {
                distances.insert(next, distance + 1);
                frontier.push_back(next);
            }
        }
    }
    unreachable!("the diamond is connected");
}

/// Runs the diamond scenario and checks both the conversation and the
/// converged routing tables against the true shortest hop counts.
pub async fn bellman_ford() {
    let shutdown = Shutdown::new();
    let scenario = BellmanFordScenario::new(shutdown.clone());
    let status = run_scenario_with_timeout(&scenario, shutdown, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(status, ExitStatus::Exited);

    assert_eq!(
        *scenario.initiator_transcript().lock().unwrap(),
        vec!["hi", "all good"]
    );
    assert_eq!(
        *scenario.responder_transcript().lock().unwrap(),
        vec!["hi there", "what's up"]
    );

    for (id, table) in scenario.tables() {
        let table = table.lock().unwrap();
        for (other, _) in ADJACENCY {
            let other = ProcessId::new(other);
            let entry = table
                .get(&other)
                .unwrap_or_else(|| panic!("{} has no route to {}", id, other));
            let expected = shortest_hops(id.into_inner(), other.into_inner());
            assert_eq!(
                entry.total_distance, expected,
                "{} -> {}: got {} hops, shortest is {}",
                id, other, entry.total_distance, expected
            );
            if id != other {
                // The chosen stepping stone must lie on some shortest path.
                let via = entry.stepping_stone;
                assert_eq!(
                    shortest_hops(via.into_inner(), other.into_inner()),
                    expected - 1,
                    "{} routes to {} via {}, which is not on a shortest path",
                    id,
                    other,
                    via
                );
            }
        }
    }
}
