//! # Exposed publisher: the producer-role object shared with the outside world.
//!
//! Downstream parties call [`ExposedPublisher::subscribe`] from any thread. Subscribers
//! are parked in a pending list and the worker is told to collect them with a
//! `SubscribePending` message. When the worker terminates it calls
//! [`ExposedPublisher::shutdown`] exactly once (later calls collapse to no-ops); from then
//! on every subscriber is refused immediately with the recorded shutdown reason.
//!
//! The publisher only holds a weak mailbox sender: the worker it belongs to keeps it,
//! and must still see its mailbox close once every [`ProcessorHandle`] is gone.
//!
//! [`ProcessorHandle`]: crate::ProcessorHandle
//!
//! ```text
//! subscribe(s) ──lock──► shutdown? ──yes──► reject(s, reason)
//!                            │
//!                            └─no──► pending.push(s) ──► mailbox: SubscribePending
//!
//! shutdown(r) ──lock──► first call? ──► record r, drain pending ──► reject each
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bridge::envelope::{DownstreamSignal, Envelope, Mailbox, WeakMailbox};
use crate::bridge::signal::reject;
use crate::error::BridgeError;
use crate::protocol::Subscriber;

/// Final state of a bridge as seen by late subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Completed or cancelled without failure.
    Normal,
    /// Terminated with a failure.
    Failed(BridgeError),
}

impl ShutdownReason {
    /// Error handed to subscribers arriving after shutdown.
    pub fn rejection(&self) -> BridgeError {
        match self {
            ShutdownReason::Normal => BridgeError::AlreadyTerminated,
            ShutdownReason::Failed(cause) => cause.clone(),
        }
    }
}

struct PublisherState<T> {
    pending: Vec<Arc<dyn Subscriber<T>>>,
    shutdown: Option<ShutdownReason>,
}

/// Producer-role object of a bridge.
pub struct ExposedPublisher<T> {
    mailbox: WeakMailbox<T>,
    state: Mutex<PublisherState<T>>,
}

impl<T: Send + 'static> ExposedPublisher<T> {
    pub(crate) fn new(mailbox: &Mailbox<T>) -> Arc<Self> {
        Arc::new(Self {
            mailbox: mailbox.downgrade(),
            state: Mutex::new(PublisherState {
                pending: Vec::new(),
                shutdown: None,
            }),
        })
    }

    /// Registers a downstream subscriber, or refuses it if the bridge already shut down.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let refused = {
            let mut st = self.lock();
            match &st.shutdown {
                Some(reason) => Some(reason.rejection()),
                None => {
                    st.pending.push(Arc::clone(&subscriber));
                    None
                }
            }
        };

        match refused {
            Some(cause) => reject(&subscriber, cause),
            None => {
                let sent = self.mailbox.upgrade().is_some_and(|tx| {
                    tx.send(Envelope::Downstream(DownstreamSignal::SubscribePending))
                        .is_ok()
                });
                if !sent {
                    // Worker is gone without having shut us down.
                    self.shutdown(ShutdownReason::Failed(BridgeError::AbruptTermination));
                }
            }
        }
    }

    /// Records the final state and refuses every still-pending subscriber.
    ///
    /// Returns `false` if a shutdown was already recorded (the call has no effect).
    pub fn shutdown(&self, reason: ShutdownReason) -> bool {
        let pending = {
            let mut st = self.lock();
            if st.shutdown.is_some() {
                return false;
            }
            st.shutdown = Some(reason.clone());
            std::mem::take(&mut st.pending)
        };
        let cause = reason.rejection();
        for subscriber in &pending {
            reject(subscriber, cause.clone());
        }
        true
    }

    /// Recorded shutdown reason, if the bridge terminated.
    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.lock().shutdown.clone()
    }

    /// Takes all subscribers waiting to be bound.
    pub(crate) fn take_pending(&self) -> Vec<Arc<dyn Subscriber<T>>> {
        std::mem::take(&mut self.lock().pending)
    }

    pub(crate) fn mailbox(&self) -> &WeakMailbox<T> {
        &self.mailbox
    }

    fn lock(&self) -> MutexGuard<'_, PublisherState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
