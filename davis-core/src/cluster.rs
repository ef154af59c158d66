//! Turning a [`Topology`] into a running cluster and keeping it advancing.

use crate::{
    error::{ConfigurationError, SimError},
    node::{Node, MAILBOX_CAPACITY},
    shutdown::{ExitStatus, Shutdown},
    Envelope, ProcessId, Topology,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinSet};

/// A live instantiation of a [`Topology`]: one fabric node per process, each
/// holding its inbound mailbox and senders to its neighbors' mailboxes.
///
/// Nodes do not share a clock. Each one runs in its own task, looping step
/// and yield until the shutdown handle fires; message latency and
/// interleaving between nodes are nondeterministic by design.
pub struct Cluster {
    nodes: Vec<Node>,
}

impl Cluster {
    /// Wires the topology's processes together with bounded mailboxes.
    ///
    /// Fails eagerly if a descriptor key does not match its process's own
    /// id, or if a neighbor set names a process the topology does not
    /// contain. Self-links are skipped.
    pub fn new(topology: Topology) -> Result<Self, ConfigurationError> {
        for (&key, node) in &topology.nodes {
            let actual = node.process.id();
            if key != actual {
                return Err(ConfigurationError::IdMismatch { key, actual });
            }
        }

        let mut senders = BTreeMap::new();
        let mut inboxes = BTreeMap::new();
        for &id in topology.nodes.keys() {
            let (sender, inbox) = mpsc::channel::<Envelope>(MAILBOX_CAPACITY);
            senders.insert(id, sender);
            inboxes.insert(id, inbox);
        }

        let mut nodes = Vec::with_capacity(topology.nodes.len());
        for (id, descriptor) in topology.nodes {
            let mut outbound = FxHashMap::default();
            for &neighbor in &descriptor.neighbors {
                if neighbor == id {
                    continue;
                }
                let Some(sender) = senders.get(&neighbor) else {
                    return Err(ConfigurationError::UnknownNeighbor { from: id, to: neighbor });
                };
                outbound.insert(neighbor, sender.clone());
            }
            let inbox = inboxes.remove(&id).expect("an inbox exists for every node");
            nodes.push(Node::new(descriptor.process, inbox, outbound));
        }
        Ok(Self { nodes })
    }

    /// The number of nodes in the cluster.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drives every node until the shutdown handle fires.
    ///
    /// Each node runs an unbounded loop of tick-then-yield in its own task;
    /// there are no rounds and no barrier between nodes. A fatal tick error
    /// shuts the whole cluster down with [`ExitStatus::Faulted`] and is
    /// returned once every node has stopped.
    pub async fn run(self, shutdown: Shutdown) -> Result<ExitStatus, SimError> {
        let mut tasks = JoinSet::new();
        for node in self.nodes {
            tasks.spawn(drive_node(node, shutdown.clone()));
        }

        let mut status = ExitStatus::Exited;
        let mut fatal = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.expect("node tasks do not panic") {
                Ok(observed) => status = observed,
                Err(error) => fatal = fatal.or(Some(error)),
            }
        }
        match fatal {
            Some(error) => Err(error),
            None => Ok(status),
        }
    }

    /// Like [`run`](Cluster::run), but shuts the cluster down with
    /// [`ExitStatus::TimedOut`] once `duration` has elapsed.
    pub async fn run_with_timeout(
        self,
        shutdown: Shutdown,
        duration: Duration,
    ) -> Result<ExitStatus, SimError> {
        let deadline = shutdown.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            deadline.shut_down_with_status(ExitStatus::TimedOut);
        });
        let result = self.run(shutdown).await;
        timer.abort();
        result
    }
}

/// One node's drive loop: tick, yield, repeat, until shutdown.
async fn drive_node(mut node: Node, shutdown: Shutdown) -> Result<ExitStatus, SimError> {
    let mut observer = shutdown.clone();
    let stopped = observer.wait_for_shutdown();
    tokio::pin!(stopped);
    loop {
        tokio::select! {
            biased;
            status = &mut stopped => return Ok(status),
            _ = tokio::task::yield_now() => {
                if let Err(error) = node.tick() {
                    tracing::error!("{}: fatal: {}", node.id(), error);
                    shutdown.shut_down_with_status(ExitStatus::Faulted);
                    return Err(error);
                }
            }
        }
    }
}
