use davis_core::{
    logging,
    process::{Process, ReceiveFn, SendFn},
    Envelope, Message, ProcessId, ProtocolViolation, Shutdown,
};
use std::sync::{Arc, Mutex};

/// The phrases a [`Conversation`] has received, in order, behind a shared
/// handle so a scenario can inspect them after the run.
pub type Transcript = Arc<Mutex<Vec<String>>>;

/// A process that holds a scripted conversation with one fixed peer.
///
/// The initiator sends its first phrase on its first tick; after that, each
/// phrase received from the peer triggers the next phrase in the script.
/// Once a process has sent its whole script and heard the same number of
/// phrases back, the conversation is complete; if it holds a [`Shutdown`],
/// it ends the simulation then. A message from any other source, or of any
/// kind other than content, is a protocol violation.
pub struct Conversation {
    id: ProcessId,
    friend: ProcessId,
    phrases: Vec<String>,
    phrase_index: usize,
    initiate: bool,
    transcript: Transcript,
    shutdown: Option<Shutdown>,
}

impl Conversation {
    pub fn new(
        id: ProcessId,
        friend: ProcessId,
        phrases: impl IntoIterator<Item = impl Into<String>>,
        initiate: bool,
    ) -> Self {
        Self {
            id,
            friend,
            phrases: phrases.into_iter().map(Into::into).collect(),
            phrase_index: 0,
            initiate,
            transcript: Default::default(),
            shutdown: None,
        }
    }

    /// Records received phrases into the given shared transcript.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    /// Ends the simulation when this side's conversation completes.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// A handle to the phrases received so far.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    fn send_phrase(&mut self, send: &mut SendFn) {
        if self.phrase_index >= self.phrases.len() {
            return;
        }
        send(Envelope::new(
            self.id,
            self.friend,
            Message::Content(self.phrases[self.phrase_index].clone()),
        ));
        self.phrase_index += 1;
    }
}

impl Process for Conversation {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn step(
        &mut self,
        send: &mut SendFn,
        receive: &mut ReceiveFn,
    ) -> Result<(), ProtocolViolation> {
        if self.initiate {
            self.send_phrase(send);
            self.initiate = false;
        }
        let Some(received) = receive() else {
            return Ok(());
        };
        if received.from != self.friend {
            return Err(ProtocolViolation::UnexpectedSource {
                from: received.from,
            });
        }
        let Message::Content(phrase) = received.message else {
            return Err(ProtocolViolation::UnexpectedMessage {
                layer: "conversation",
                message: received.message.to_string(),
            });
        };
        logging::node_event(self.id, &format!("received phrase '{}'", phrase));
        self.transcript.lock().unwrap().push(phrase);
        self.send_phrase(send);
        if self.phrase_index >= self.phrases.len() {
            logging::node_event(self.id, "conversation complete");
            if self.transcript.lock().unwrap().len() >= self.phrases.len() {
                if let Some(shutdown) = self.shutdown.take() {
                    shutdown.shut_down();
                }
            }
        }
        Ok(())
    }
}
