//! Describing which processes make up a cluster and how they are linked.

use crate::{Process, ProcessId};
use std::collections::{BTreeMap, BTreeSet};

/// One node of a [`Topology`]: the process to run and the ids of its direct
/// neighbors. Neighbor sets define the undirected adjacency used to wire
/// mailboxes; self-links are skipped when the cluster is built.
pub struct TopologyNode {
    pub process: Box<dyn Process>,
    pub neighbors: BTreeSet<ProcessId>,
}

impl TopologyNode {
    pub fn new(
        process: Box<dyn Process>,
        neighbors: impl IntoIterator<Item = ProcessId>,
    ) -> Self {
        Self {
            process,
            neighbors: neighbors.into_iter().collect(),
        }
    }
}

/// An abstract description of a cluster: a mapping from process id to node
/// descriptor. Each descriptor key must equal its process's own id; this is
/// validated once when a [`Cluster`](crate::Cluster) is built.
///
/// Keyed by a `BTreeMap` so construction and wiring happen in a stable
/// order; protocol correctness never depends on it.
#[derive(Default)]
pub struct Topology {
    pub nodes: BTreeMap<ProcessId, TopologyNode>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ProcessId, node: TopologyNode) {
        self.nodes.insert(id, node);
    }

    /// Builds a topology in which every process is a neighbor of every
    /// other, for scenarios that do not need partial connectivity.
    pub fn complete_graph(processes: impl IntoIterator<Item = Box<dyn Process>>) -> Self {
        let processes: Vec<_> = processes.into_iter().collect();
        let ids: BTreeSet<ProcessId> = processes.iter().map(|p| p.id()).collect();
        let mut topology = Topology::new();
        for process in processes {
            let id = process.id();
            let neighbors = ids.iter().copied().filter(|&other| other != id);
            topology.insert(id, TopologyNode::new(process, neighbors));
        }
        topology
    }
}

impl FromIterator<(ProcessId, TopologyNode)> for Topology {
    fn from_iter<T: IntoIterator<Item = (ProcessId, TopologyNode)>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
