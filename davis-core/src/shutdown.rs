use tokio::sync::broadcast;

/// A handle which can be used to shut down a running cluster.
///
/// Cloning produces connected handles: a shutdown signaled through any clone
/// is observed by all of them. Each clone subscribes when it is created, so
/// a signal sent after the clone exists is never missed, even if the holder
/// has not started waiting yet. Scenario processes may hold a clone and end
/// the run when their work completes.
#[derive(Debug)]
pub struct Shutdown {
    notify: broadcast::Sender<ExitStatus>,
    receiver: broadcast::Receiver<ExitStatus>,
    /// Remembers the first status received so `wait_for_shutdown` can be
    /// called more than once.
    last_status: Option<ExitStatus>,
}

impl Shutdown {
    /// Creates a new active shutdown.
    pub fn new() -> Self {
        let (notify, receiver) = broadcast::channel(2);
        Self {
            notify,
            receiver,
            last_status: None,
        }
    }

    /// Sends [`ExitStatus::Exited`] to all handles cloned from this one.
    pub fn shut_down(&self) {
        self.shut_down_with_status(ExitStatus::Exited);
    }

    /// Sends `status` to all handles cloned from this one.
    pub fn shut_down_with_status(&self, status: ExitStatus) {
        if let Err(e) = self.notify.send(status) {
            tracing::error!("Failed to initiate shutdown: {}", e);
        }
    }

    /// Waits to receive a shutdown status.
    pub async fn wait_for_shutdown(&mut self) -> ExitStatus {
        use broadcast::error::RecvError;

        if let Some(status) = self.last_status {
            return status;
        }
        loop {
            match self.receiver.recv().await {
                Ok(status) => {
                    self.last_status = Some(status);
                    return status;
                }
                Err(RecvError::Closed) => unreachable!(),
                Err(RecvError::Lagged(_)) => (),
            }
        }
    }
}

impl Clone for Shutdown {
    fn clone(&self) -> Self {
        Self {
            notify: self.notify.clone(),
            receiver: self.notify.subscribe(),
            last_status: self.last_status,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a cluster stopped running.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExitStatus {
    /// A process asked for an orderly shutdown.
    Exited,
    /// The run hit its deadline.
    TimedOut,
    /// A node raised a fatal error.
    Faulted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_clones_observe_status() {
        let shut0 = Shutdown::new();
        let mut shuts = [shut0.clone(), shut0.clone(), shut0.clone()];

        shuts[0].shut_down_with_status(ExitStatus::TimedOut);

        for shut in &mut shuts {
            assert_eq!(shut.wait_for_shutdown().await, ExitStatus::TimedOut);
        }
    }

    #[tokio::test]
    async fn signal_before_wait_is_not_lost() {
        let mut observer = Shutdown::new();
        let trigger = observer.clone();
        trigger.shut_down();
        assert_eq!(observer.wait_for_shutdown().await, ExitStatus::Exited);
    }
}
