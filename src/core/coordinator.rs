//! # Coordinator: one bridge worker's state and its lifecycle paths.
//!
//! Owns the [`BatchingInputBuffer`], the [`DemandLedger`] and the failure latch shared
//! with the buffer's error sink. All state is mutated through `&mut self` from the
//! owning actor task only, one message at a time.
//!
//! ## Message flow
//! ```text
//! Envelope::Expose(p)      ──► output.install(p)
//! Envelope::Upstream(sig)  ──► input.handle(sig)
//! Envelope::Downstream(sig)──► output.handle(sig)
//!                                   │
//!                                   ▼
//!                              pump::drive()
//!                   ┌───────────────┼────────────────┐
//!                Pending         Drained          Failed(cause)
//!                   │               │                 │
//!               Continue        finish()          fail(cause)
//!                               (Stop)             (Stop)
//! ```
//!
//! ## Terminal paths
//! - `finish()`: cancel input, complete output.
//! - `fail(cause)`: cancel input, fail output with `cause`.
//! - `abort()`: cancel input, fail output with [`BridgeError::AbruptTermination`].
//! - `pre_restart(cause)`: `fail(cause)`, then refuse with [`BridgeError::RestartForbidden`].
//!
//! Each path runs at most once; after the first, every call is a no-op returning `Stop`.

use std::sync::Arc;

use crate::bridge::{DownstreamSignal, Envelope, UpstreamSignal};
use crate::core::config::Config;
use crate::core::pump::{self, DriveOutcome, FailureLatch};
use crate::error::BridgeError;
use crate::events::{Bus, Event, EventKind};
use crate::input::{BatchingInputBuffer, InputState};
use crate::output::DemandLedger;

/// What the actor should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    /// Keep receiving.
    Continue,
    /// Stop the worker; never process another message.
    Stop,
}

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Input drained (or downstream cancelled) and output completed.
    Finished,
    /// Failed with the given cause.
    Failed(BridgeError),
    /// Stopped by the host before completing.
    Aborted,
}

pub(crate) struct Coordinator<T> {
    name: Arc<str>,
    input: BatchingInputBuffer<T>,
    output: DemandLedger<T>,
    latch: FailureLatch,
    bus: Bus,
    debug: bool,
    termination: Option<Termination>,
}

impl<T: Send + 'static> Coordinator<T> {
    /// Builds an idle worker state.
    ///
    /// # Errors
    /// [`BridgeError::InvalidCapacity`] for an invalid `buffer_capacity`.
    pub(crate) fn new(name: Arc<str>, cfg: &Config, bus: Bus) -> Result<Self, BridgeError> {
        let latch = FailureLatch::default();
        let input = BatchingInputBuffer::new(cfg.buffer_capacity, latch.sink())?;
        Ok(Self {
            name,
            input,
            output: DemandLedger::new(),
            latch,
            bus,
            debug: cfg.debug,
            termination: None,
        })
    }

    /// Handles one message, then runs the pump.
    ///
    /// # Errors
    /// Invariant violations. The caller decides between [`Self::fail`] and
    /// [`Self::pre_restart`]; state is left untouched for that decision.
    pub(crate) fn handle(&mut self, msg: Envelope<T>) -> Result<Directive, BridgeError> {
        if self.termination.is_some() {
            return Ok(Directive::Stop);
        }
        match msg {
            Envelope::Expose(exposed) => self.output.install(exposed)?,
            Envelope::Upstream(signal) => self.on_upstream(signal)?,
            Envelope::Downstream(signal) => self.on_downstream(signal)?,
        }
        Ok(self.pump())
    }

    fn on_upstream(&mut self, signal: UpstreamSignal<T>) -> Result<(), BridgeError> {
        let event = match (&signal, self.input.state()) {
            (UpstreamSignal::OnSubscribe(_), InputState::AwaitingSubscription) => Some(
                self.event(EventKind::UpstreamSubscribed)
                    .with_demand(self.input.capacity() as i64),
            ),
            (UpstreamSignal::OnComplete, state) if state != InputState::Completed => {
                Some(self.event(EventKind::UpstreamCompleted))
            }
            (UpstreamSignal::OnError(cause), state) if state != InputState::Completed => {
                Some(self.event(EventKind::UpstreamFailed).with_error(cause))
            }
            _ => None,
        };
        self.input.handle(signal)?;
        if let Some(ev) = event {
            self.bus.publish(ev);
        }
        Ok(())
    }

    fn on_downstream(&mut self, signal: DownstreamSignal) -> Result<(), BridgeError> {
        let open = !self.output.is_closed();
        let reg = self.output.handle(signal)?;

        if reg.bound {
            self.bus.publish(self.event(EventKind::DownstreamSubscribed));
        }
        if reg.rejected > 0 {
            self.bus.publish(
                self.event(EventKind::SubscriberRejected)
                    .with_reason(format!("rejected={}", reg.rejected)),
            );
        }
        match signal {
            DownstreamSignal::Request(n) if open && self.debug => {
                self.bus
                    .publish(self.event(EventKind::DemandRequested).with_demand(n));
            }
            DownstreamSignal::Cancel if open => {
                self.bus.publish(self.event(EventKind::DownstreamCancelled));
            }
            _ => {}
        }
        Ok(())
    }

    fn pump(&mut self) -> Directive {
        let requested_before = self.input.requested_total();
        let (bus, name, debug) = (&self.bus, &self.name, self.debug);
        let outcome = pump::drive(&mut self.input, &mut self.output, &self.latch, |outstanding| {
            if debug {
                bus.publish(
                    Event::new(EventKind::ElementEmitted)
                        .with_bridge(Arc::clone(name))
                        .with_demand(outstanding),
                );
            }
        });

        let batch = self.input.requested_total() - requested_before;
        if self.debug && batch > 0 {
            self.bus.publish(
                self.event(EventKind::BatchRequested)
                    .with_demand(i64::try_from(batch).unwrap_or(i64::MAX)),
            );
        }

        match outcome {
            DriveOutcome::Pending => Directive::Continue,
            DriveOutcome::Drained => self.finish(),
            DriveOutcome::Failed(cause) => self.fail(cause),
        }
    }

    /// Normal termination.
    pub(crate) fn finish(&mut self) -> Directive {
        if self.termination.is_some() {
            return Directive::Stop;
        }
        self.input.cancel();
        self.output.complete();
        self.termination = Some(Termination::Finished);
        self.bus.publish(self.event(EventKind::BridgeFinished));
        Directive::Stop
    }

    /// Failure termination shared by every error source.
    pub(crate) fn fail(&mut self, cause: BridgeError) -> Directive {
        if self.termination.is_some() {
            return Directive::Stop;
        }
        self.latch.trip(cause.clone());
        self.input.cancel();
        self.output.fail_with(cause.clone());
        self.bus
            .publish(self.event(EventKind::BridgeFailed).with_error(&cause));
        self.termination = Some(Termination::Failed(cause));
        Directive::Stop
    }

    /// Host stopped the worker without graceful completion.
    pub(crate) fn abort(&mut self) {
        if self.termination.is_some() {
            return;
        }
        self.input.cancel();
        self.output.fail_with(BridgeError::AbruptTermination);
        self.termination = Some(Termination::Aborted);
        self.bus.publish(self.event(EventKind::BridgeAborted));
    }

    /// Refuses a restart: fails with `cause` and reports why the worker cannot resume.
    pub(crate) fn pre_restart(&mut self, cause: BridgeError) -> BridgeError {
        self.fail(cause.clone());
        let refused = BridgeError::RestartForbidden {
            cause: Box::new(cause),
        };
        self.bus
            .publish(self.event(EventKind::RestartRejected).with_error(&refused));
        refused
    }

    pub(crate) fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_bridge(Arc::clone(&self.name))
    }
}
