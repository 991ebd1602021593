//! Per-message publish outcome handles.

use tokio::sync::oneshot;

use crate::error::PublishError;

/// Broker-assigned id of a published message.
pub type MessageId = String;

type Outcome = Result<MessageId, PublishError>;

/// Asynchronous placeholder for one message's publish result.
///
/// Returned by `Topic::publish` without waiting on the broker; `get` resolves
/// once the broker acknowledges or rejects the message.
#[derive(Debug)]
pub struct OutcomeHandle {
    state: State,
}

#[derive(Debug)]
enum State {
    Ready(Outcome),
    Pending(oneshot::Receiver<Outcome>),
}

/// Completes the paired `OutcomeHandle`.
#[derive(Debug)]
pub struct OutcomeSender {
    tx: oneshot::Sender<Outcome>,
}

impl OutcomeHandle {
    /// A handle that is already resolved.
    pub fn ready(outcome: Outcome) -> Self {
        Self {
            state: State::Ready(outcome),
        }
    }

    /// A handle resolved later through the returned sender.
    pub fn pending() -> (OutcomeSender, Self) {
        let (tx, rx) = oneshot::channel();
        (
            OutcomeSender { tx },
            Self {
                state: State::Pending(rx),
            },
        )
    }

    /// Wait for the broker's answer.
    ///
    /// A sender dropped without resolving yields `PublishError::OutcomeDropped`.
    pub async fn get(self) -> Outcome {
        match self.state {
            State::Ready(outcome) => outcome,
            State::Pending(rx) => rx.await.unwrap_or(Err(PublishError::OutcomeDropped)),
        }
    }
}

impl OutcomeSender {
    pub fn resolve(self, outcome: Outcome) {
        // The handle may already be gone; nobody is left to tell.
        let _ = self.tx.send(outcome);
    }
}
