//! # BridgeActor: the single task that owns one bridge worker.
//!
//! Drains the worker mailbox one message at a time and feeds it to the
//! [`Coordinator`]. Nothing else touches the coordinator, so buffer and ledger state
//! need no locking.
//!
//! ## Architecture
//! ```text
//! Host::spawn_bridge() ──► BridgeActor::new() ──► tokio::spawn(actor.run(child_token))
//!
//! loop {
//!   select! {
//!     token.cancelled()  ─► coordinator.abort()            ─► Aborted
//!     mailbox closed     ─► coordinator.abort()            ─► Aborted
//!     mailbox.recv()     ─► coordinator.handle(msg)
//!                             ├─► Ok(Continue)             ─► next message
//!                             ├─► Ok(Stop)                 ─► Finished / Failed
//!                             ├─► panic                    ─► fail(WorkerPanicked)
//!                             └─► Err(invariant violation)
//!                                   ├─► RestartPolicy::Never     ─► fail(cause)
//!                                   └─► RestartPolicy::OnFailure ─► pre_restart(cause)
//!   }
//! }
//! close mailbox, cancel any upstream subscription still queued,
//! record the shutdown reason on the exposed publisher
//! ```
//!
//! ## Rules
//! - Messages are processed **sequentially**, in mailbox order.
//! - After the worker stops, queued upstream grants are cancelled and everything else
//!   is dropped.
//! - The exposed publisher always ends with a shutdown reason, even when the worker stops
//!   before installing it, so parked subscribers are always refused.
//! - The mailbox closes once every handle is dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::bridge::signal::panic_info;
use crate::bridge::{
    Envelope, ExposedPublisher, MailboxRx, ProcessorHandle, ShutdownReason, UpstreamSignal,
    mailbox,
};
use crate::core::config::Config;
use crate::core::coordinator::{Coordinator, Directive, Termination};
use crate::error::BridgeError;
use crate::events::Bus;
use crate::policies::RestartPolicy;

/// Runs one bridge worker until it finishes, fails or is aborted.
pub(crate) struct BridgeActor<T> {
    coord: Coordinator<T>,
    rx: MailboxRx<T>,
    exposed: Arc<ExposedPublisher<T>>,
    restart: RestartPolicy,
}

impl<T: Send + 'static> BridgeActor<T> {
    /// Builds the worker and its handle; the exposed publisher is the first queued message.
    ///
    /// # Errors
    /// [`BridgeError::InvalidCapacity`] for an invalid buffer capacity.
    pub(crate) fn new(
        name: Arc<str>,
        cfg: &Config,
        bus: Bus,
    ) -> Result<(Self, ProcessorHandle<T>), BridgeError> {
        let coord = Coordinator::new(Arc::clone(&name), cfg, bus)?;
        let (tx, rx) = mailbox::<T>();
        let exposed = ExposedPublisher::new(&tx);
        // Receiver is alive here, so this send cannot fail.
        let _ = tx.send(Envelope::Expose(Arc::clone(&exposed)));

        let actor = Self {
            coord,
            rx,
            exposed: Arc::clone(&exposed),
            restart: cfg.restart,
        };
        Ok((actor, ProcessorHandle::new(name, tx, exposed)))
    }

    /// Processes messages until the worker stops or `token` is cancelled.
    pub(crate) async fn run(mut self, token: CancellationToken) -> Termination {
        loop {
            select! {
                biased;
                _ = token.cancelled() => {
                    self.coord.abort();
                    break;
                }
                msg = self.rx.recv() => {
                    let Some(msg) = msg else {
                        self.coord.abort();
                        break;
                    };
                    let coord = &mut self.coord;
                    match catch_unwind(AssertUnwindSafe(|| coord.handle(msg))) {
                        Ok(Ok(Directive::Continue)) => {}
                        Ok(Ok(Directive::Stop)) => break,
                        Ok(Err(violation)) => {
                            self.on_violation(violation);
                            break;
                        }
                        Err(panic) => {
                            self.coord.fail(BridgeError::WorkerPanicked {
                                info: panic_info(panic.as_ref()),
                            });
                            break;
                        }
                    }
                }
            }
        }
        self.close_mailbox();
        let termination = self
            .coord
            .termination()
            .cloned()
            .unwrap_or(Termination::Aborted);
        self.exposed.shutdown(match &termination {
            Termination::Finished => ShutdownReason::Normal,
            Termination::Failed(cause) => ShutdownReason::Failed(cause.clone()),
            Termination::Aborted => ShutdownReason::Failed(BridgeError::AbruptTermination),
        });
        termination
    }

    fn on_violation(&mut self, violation: BridgeError) {
        match self.restart {
            RestartPolicy::Never => {
                self.coord.fail(violation);
            }
            RestartPolicy::OnFailure => {
                let _ = self.coord.pre_restart(violation);
            }
        }
    }

    fn close_mailbox(&mut self) {
        self.rx.close();
        while let Ok(msg) = self.rx.try_recv() {
            if let Envelope::Upstream(UpstreamSignal::OnSubscribe(subscription)) = msg {
                subscription.cancel();
            }
        }
    }
}
