//! # Pump: moves elements from the input buffer to the demand ledger.
//!
//! Level-triggered: the coordinator calls [`drive`] after every mailbox message,
//! whatever changed. Each call moves as many elements as both sides currently allow,
//! then reports the combined state.
//!
//! ```text
//! while input.has_available && output.has_demand && !failed:
//!     output.emit(input.take_next())
//!
//! failed (latch or ledger)          ─► Failed(cause)
//! input exhausted | output closed   ─► Drained
//! otherwise                         ─► Pending
//! ```
//!
//! Calling it when nothing can move is a no-op returning the same outcome.

use std::sync::{Arc, OnceLock};

use crate::error::BridgeError;
use crate::input::{BatchingInputBuffer, ErrorSink};
use crate::output::DemandLedger;

/// Outcome of one pump run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DriveOutcome {
    /// Waiting for data or demand.
    Pending,
    /// Nothing more will ever be emitted; finish normally.
    Drained,
    /// One side failed; fail the whole bridge.
    Failed(BridgeError),
}

/// First failure reported by either side; later reports are ignored.
#[derive(Clone, Default)]
pub(crate) struct FailureLatch(Arc<OnceLock<BridgeError>>);

impl FailureLatch {
    pub(crate) fn trip(&self, cause: BridgeError) {
        let _ = self.0.set(cause);
    }

    pub(crate) fn get(&self) -> Option<&BridgeError> {
        self.0.get()
    }

    /// Error sink for the input buffer that trips this latch.
    pub(crate) fn sink(&self) -> ErrorSink {
        let latch = self.clone();
        Box::new(move |cause| latch.trip(cause))
    }
}

/// Runs the transfer loop once; `on_emit` sees the outstanding demand after each element.
pub(crate) fn drive<T: Send + 'static>(
    input: &mut BatchingInputBuffer<T>,
    output: &mut DemandLedger<T>,
    latch: &FailureLatch,
    mut on_emit: impl FnMut(i64),
) -> DriveOutcome {
    while latch.get().is_none()
        && !output.is_closed()
        && input.has_available()
        && output.has_demand()
    {
        let element = match input.take_next() {
            Ok(element) => element,
            Err(violation) => {
                latch.trip(violation);
                break;
            }
        };
        if let Err(violation) = output.emit(element) {
            latch.trip(violation);
            break;
        }
        on_emit(output.outstanding());
    }

    if let Some(cause) = latch.get().or(output.failure()) {
        return DriveOutcome::Failed(cause.clone());
    }
    if input.is_exhausted() || output.is_closed() {
        DriveOutcome::Drained
    } else {
        DriveOutcome::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ExposedPublisher, Mailbox, MailboxRx, mailbox};
    use crate::testing::{RecordingSubscriber, RecordingSubscription, Signal};

    struct Rig {
        input: BatchingInputBuffer<u32>,
        output: DemandLedger<u32>,
        latch: FailureLatch,
        upstream: Arc<RecordingSubscription>,
        downstream: Arc<RecordingSubscriber<u32>>,
        _mailbox: (Mailbox<u32>, MailboxRx<u32>),
    }

    impl Rig {
        fn new(capacity: usize) -> Self {
            let latch = FailureLatch::default();
            let mut input = BatchingInputBuffer::new(capacity, latch.sink()).expect("capacity");
            let upstream = RecordingSubscription::new();
            input
                .on_subscription_granted(upstream.clone())
                .expect("grant");

            let (tx, rx) = mailbox::<u32>();
            let mut output = DemandLedger::new();
            output.install(ExposedPublisher::new(&tx)).expect("install");
            let downstream = RecordingSubscriber::<u32>::new();
            output.register_pending_subscribers(vec![downstream.clone()]);

            Self {
                input,
                output,
                latch,
                upstream,
                downstream,
                _mailbox: (tx, rx),
            }
        }

        fn drive(&mut self) -> DriveOutcome {
            drive(&mut self.input, &mut self.output, &self.latch, |_| {})
        }
    }

    #[test]
    fn moves_only_what_demand_allows() {
        let mut rig = Rig::new(4);
        for i in 0..4 {
            rig.input.on_element_arrived(i).expect("room");
        }
        rig.output.request_more(3);

        assert_eq!(rig.drive(), DriveOutcome::Pending);
        assert_eq!(rig.downstream.elements(), vec![0, 1, 2]);
        assert_eq!(rig.input.len(), 1);
        assert!(!rig.output.has_demand());
    }

    #[test]
    fn redundant_drive_is_a_no_op() {
        let mut rig = Rig::new(4);
        rig.input.on_element_arrived(1).expect("room");
        assert_eq!(rig.drive(), DriveOutcome::Pending);
        assert_eq!(rig.drive(), DriveOutcome::Pending);
        assert!(rig.downstream.elements().is_empty());
        assert_eq!(rig.input.len(), 1);
    }

    #[test]
    fn drains_once_input_is_exhausted() {
        let mut rig = Rig::new(2);
        rig.input.on_element_arrived(5).expect("room");
        rig.input.on_upstream_completed();
        assert_eq!(rig.drive(), DriveOutcome::Pending);

        rig.output.request_more(10);
        assert_eq!(rig.drive(), DriveOutcome::Drained);
        assert_eq!(rig.downstream.elements(), vec![5]);
        assert_eq!(rig.upstream.requests(), vec![2]);
    }

    #[test]
    fn output_cancel_drains() {
        let mut rig = Rig::new(2);
        rig.output.cancel();
        assert_eq!(rig.drive(), DriveOutcome::Drained);
    }

    #[test]
    fn upstream_error_fails() {
        let mut rig = Rig::new(2);
        rig.input.on_element_arrived(1).expect("room");
        rig.input.on_upstream_error(BridgeError::upstream("eof"));
        rig.output.request_more(1);

        assert_eq!(
            rig.drive(),
            DriveOutcome::Failed(BridgeError::upstream("eof"))
        );
        assert!(rig.downstream.elements().is_empty());
    }

    #[test]
    fn ledger_violation_fails() {
        let mut rig = Rig::new(2);
        rig.output.request_more(0);
        assert_eq!(
            rig.drive(),
            DriveOutcome::Failed(BridgeError::NonPositiveRequest { requested: 0 })
        );
        assert_eq!(
            rig.downstream.signals(),
            vec![
                Signal::Subscribed,
                Signal::Error(BridgeError::NonPositiveRequest { requested: 0 })
            ]
        );
    }

    #[test]
    fn latch_keeps_first_failure() {
        let latch = FailureLatch::default();
        latch.trip(BridgeError::upstream("first"));
        latch.trip(BridgeError::AbruptTermination);
        assert_eq!(latch.get(), Some(&BridgeError::upstream("first")));
    }
}
