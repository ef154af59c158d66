use crate::applications::{LamportClock, RandomTraffic};
use davis_core::{
    run_scenario_with_timeout,
    shutdown::{ExitStatus, Shutdown},
    Process, ProcessId, Scenario, Topology,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

const NODES: u64 = 6;
const TICK_BUDGET: u32 = 200;

/// A complete graph of traffic generators, each wrapped in a logical-clock
/// layer, firing random messages at each other for a while. There is no
/// completion condition; the run ends on its timeout.
pub struct RandomTrafficScenario {
    received: Arc<Mutex<usize>>,
    clocks: Mutex<Vec<Arc<Mutex<u64>>>>,
}

impl RandomTrafficScenario {
    pub fn new() -> Self {
        Self {
            received: Default::default(),
            clocks: Mutex::new(Vec::new()),
        }
    }

    /// Messages received across all nodes.
    pub fn received(&self) -> Arc<Mutex<usize>> {
        self.received.clone()
    }

    /// Every node's logical clock, captured during the last `network` call.
    pub fn clocks(&self) -> Vec<Arc<Mutex<u64>>> {
        self.clocks.lock().unwrap().clone()
    }
}

impl Default for RandomTrafficScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for RandomTrafficScenario {
    fn network(&self) -> Topology {
        let mut clocks = self.clocks.lock().unwrap();
        clocks.clear();

        let ids: Vec<ProcessId> = (1..=NODES).map(ProcessId::new).collect();
        let mut processes: Vec<Box<dyn Process>> = Vec::new();
        for &id in &ids {
            let peers = ids.iter().copied().filter(|&p| p != id).collect();
            let traffic = RandomTraffic::new(id, peers, TICK_BUDGET)
                .with_received_counter(self.received.clone());
            let clocked = LamportClock::new(Box::new(traffic));
            clocks.push(clocked.clock_handle());
            processes.push(Box::new(clocked));
        }
        Topology::complete_graph(processes)
    }
}

/// Runs the traffic scenario for a fixed slice of real time and checks that
/// messages actually flowed.
pub async fn random_traffic() {
    let scenario = RandomTrafficScenario::new();
    let status = run_scenario_with_timeout(
        &scenario,
        Shutdown::new(),
        Duration::from_millis(250),
    )
    .await
    .unwrap();
    assert_eq!(status, ExitStatus::TimedOut);

    assert!(
        *scenario.received().lock().unwrap() > 0,
        "no messages were delivered"
    );
    assert!(
        scenario.clocks().iter().any(|clock| *clock.lock().unwrap() > 0),
        "no logical clock ever advanced"
    );
}
