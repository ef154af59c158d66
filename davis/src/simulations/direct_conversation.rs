use crate::applications::{Conversation, Transcript};
use davis_core::{
    run_scenario_with_timeout,
    shutdown::{ExitStatus, Shutdown},
    Process, ProcessId, ReliableTransport, Scenario, Topology,
};
use std::time::Duration;

/// Two directly linked nodes talking over the reliable transport with no
/// routing in between: exercises lazy connection setup, sequencing, and the
/// ack flow on a single link.
pub struct DirectConversationScenario {
    shutdown: Shutdown,
    initiator_transcript: Transcript,
    responder_transcript: Transcript,
}

impl DirectConversationScenario {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            shutdown,
            initiator_transcript: Default::default(),
            responder_transcript: Default::default(),
        }
    }

    pub fn initiator_transcript(&self) -> Transcript {
        self.initiator_transcript.clone()
    }

    pub fn responder_transcript(&self) -> Transcript {
        self.responder_transcript.clone()
    }
}

impl Scenario for DirectConversationScenario {
    fn network(&self) -> Topology {
        let one = ProcessId::new(1);
        let two = ProcessId::new(2);
        let initiator = Conversation::new(one, two, ["knock knock", "davis"], true)
            .with_transcript(self.initiator_transcript.clone())
            .with_shutdown(self.shutdown.clone());
        let responder = Conversation::new(two, one, ["who's there", "davis who"], false)
            .with_transcript(self.responder_transcript.clone());
        Topology::complete_graph([
            Box::new(ReliableTransport::new(Box::new(initiator))) as Box<dyn Process>,
            Box::new(ReliableTransport::new(Box::new(responder))),
        ])
    }
}

/// Runs the two-node scenario and checks both transcripts.
pub async fn direct_conversation() {
    let shutdown = Shutdown::new();
    let scenario = DirectConversationScenario::new(shutdown.clone());
    let status = run_scenario_with_timeout(&scenario, shutdown, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(status, ExitStatus::Exited);

    assert_eq!(
        *scenario.initiator_transcript().lock().unwrap(),
        vec!["who's there", "davis who"]
    );
    assert_eq!(
        *scenario.responder_transcript().lock().unwrap(),
        vec!["knock knock", "davis"]
    );
}
