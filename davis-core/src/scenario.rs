//! The [`Scenario`] contract consumed by the runner.

use crate::{
    shutdown::{ExitStatus, Shutdown},
    Cluster, SimError, Topology,
};
use std::time::Duration;

/// A description of one simulation: the node set, each node's wrapped
/// process chain, and its neighbor set.
pub trait Scenario {
    /// Builds the topology this scenario runs on. Called once per run.
    fn network(&self) -> Topology;
}

/// Builds a cluster from the scenario's topology and runs it until the
/// shutdown handle fires.
pub async fn run_scenario(
    scenario: &dyn Scenario,
    shutdown: Shutdown,
) -> Result<ExitStatus, SimError> {
    let cluster = Cluster::new(scenario.network())?;
    cluster.run(shutdown).await
}

/// Like [`run_scenario`], with a hard deadline for scenarios that do not
/// stop themselves.
pub async fn run_scenario_with_timeout(
    scenario: &dyn Scenario,
    shutdown: Shutdown,
    duration: Duration,
) -> Result<ExitStatus, SimError> {
    let cluster = Cluster::new(scenario.network())?;
    cluster.run_with_timeout(shutdown, duration).await
}
