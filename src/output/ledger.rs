//! # Demand ledger: the producer side of a bridge.
//!
//! Tracks the single bound downstream consumer and its outstanding demand, and turns
//! buffered elements into `on_next` signals only while demand is positive.
//!
//! ## State machine
//! ```text
//! AwaitingExposedHandle ──install──► Running ──complete / fail_with / cancel──► Completed
//! ```
//! Before the exposed publisher is installed, any downstream message is an invariant
//! violation.
//!
//! ## Rules
//! - At most one consumer is ever bound; others get a cancelled subscription and
//!   [`BridgeError::MultipleSubscribers`].
//! - `request(n < 1)` and overflow past `i64::MAX` fail the ledger; demand is left untouched.
//! - `complete`, `fail_with` and `cancel` are idempotent: the first one wins.
//! - Nothing reaches a consumer after it cancelled.
//! - A consumer that panicked while being signalled is not told about its own failure.

use std::sync::Arc;

use crate::bridge::signal::{reject, try_signal};
use crate::bridge::{DownstreamSignal, DownstreamSubscription, ExposedPublisher, ShutdownReason};
use crate::error::BridgeError;
use crate::protocol::Subscriber;

/// Lifecycle of the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Exposed publisher not installed yet.
    AwaitingExposedHandle,
    /// Serving (or waiting for) the downstream consumer.
    Running,
    /// Completed, failed or cancelled.
    Completed,
}

impl OutputState {
    fn as_str(&self) -> &'static str {
        match self {
            OutputState::AwaitingExposedHandle => "awaiting exposed publisher",
            OutputState::Running => "running",
            OutputState::Completed => "completed",
        }
    }
}

/// What [`DemandLedger::register_pending_subscribers`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// A consumer was bound by this call.
    pub bound: bool,
    /// Number of consumers refused by this call.
    pub rejected: usize,
}

/// Downstream demand and single-subscriber bookkeeping.
pub struct DemandLedger<T> {
    state: OutputState,
    exposed: Option<Arc<ExposedPublisher<T>>>,
    subscriber: Option<Arc<dyn Subscriber<T>>>,
    ever_bound: bool,
    outstanding: i64,
    failure: Option<BridgeError>,
}

impl<T: Send + 'static> Default for DemandLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> DemandLedger<T> {
    /// Creates a ledger waiting for its exposed publisher.
    pub fn new() -> Self {
        Self {
            state: OutputState::AwaitingExposedHandle,
            exposed: None,
            subscriber: None,
            ever_bound: false,
            outstanding: 0,
            failure: None,
        }
    }

    /// Installs the exposed publisher.
    ///
    /// # Errors
    /// [`BridgeError::UnexpectedMessage`] if one is already installed.
    pub fn install(&mut self, exposed: Arc<ExposedPublisher<T>>) -> Result<(), BridgeError> {
        match self.state {
            OutputState::AwaitingExposedHandle => {
                self.exposed = Some(exposed);
                self.state = OutputState::Running;
                Ok(())
            }
            other => Err(BridgeError::UnexpectedMessage {
                message: "expose_publisher",
                state: other.as_str(),
            }),
        }
    }

    /// Routes one downstream signal according to the current state.
    ///
    /// Returns what happened to pending subscribers (empty for `request`/`cancel`).
    ///
    /// # Errors
    /// [`BridgeError::UnexpectedMessage`] before the exposed publisher is installed.
    pub fn handle(&mut self, signal: DownstreamSignal) -> Result<Registration, BridgeError> {
        match (self.state, signal) {
            (OutputState::AwaitingExposedHandle, signal) => Err(BridgeError::UnexpectedMessage {
                message: signal.as_str(),
                state: self.state.as_str(),
            }),
            (_, DownstreamSignal::SubscribePending) => {
                let pending = self
                    .exposed
                    .as_ref()
                    .map(|e| e.take_pending())
                    .unwrap_or_default();
                Ok(self.register_pending_subscribers(pending))
            }
            (OutputState::Running, DownstreamSignal::Request(n)) => {
                self.request_more(n);
                Ok(Registration::default())
            }
            (OutputState::Running, DownstreamSignal::Cancel) => {
                self.cancel();
                Ok(Registration::default())
            }
            (OutputState::Completed, DownstreamSignal::Request(_) | DownstreamSignal::Cancel) => {
                Ok(Registration::default())
            }
        }
    }

    /// Binds the first candidate if nobody is bound yet; refuses the rest.
    pub fn register_pending_subscribers(
        &mut self,
        candidates: Vec<Arc<dyn Subscriber<T>>>,
    ) -> Registration {
        let mut reg = Registration::default();
        for candidate in candidates {
            if self.ever_bound || self.state == OutputState::Completed {
                let cause = match (&self.failure, self.ever_bound) {
                    (_, true) => BridgeError::MultipleSubscribers,
                    (Some(cause), false) => cause.clone(),
                    (None, false) => BridgeError::AlreadyTerminated,
                };
                reject(&candidate, cause);
                reg.rejected += 1;
                continue;
            }
            self.bind(candidate);
            reg.bound = true;
        }
        reg
    }

    /// Adds downstream demand.
    ///
    /// `n < 1` or overflow fails the ledger; outstanding demand is never mutated then.
    pub fn request_more(&mut self, n: i64) {
        if self.is_closed() {
            return;
        }
        if n < 1 {
            self.fail_with(BridgeError::NonPositiveRequest { requested: n });
            return;
        }
        match self.outstanding.checked_add(n) {
            Some(total) => self.outstanding = total,
            None => self.fail_with(BridgeError::DemandOverflow {
                outstanding: self.outstanding,
                requested: n,
            }),
        }
    }

    /// Downstream cancelled: stop serving, publish a normal shutdown.
    pub fn cancel(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = OutputState::Completed;
        self.subscriber = None;
        self.shutdown_exposed(ShutdownReason::Normal);
    }

    /// Delivers one element to the bound consumer.
    ///
    /// # Errors
    /// [`BridgeError::EmitWithoutDemand`] without positive demand, after completion or
    /// without a bound consumer.
    pub fn emit(&mut self, element: T) -> Result<(), BridgeError> {
        let subscriber = match (&self.subscriber, self.state) {
            (Some(s), OutputState::Running) if self.outstanding > 0 => Arc::clone(s),
            _ => {
                return Err(BridgeError::EmitWithoutDemand {
                    outstanding: self.outstanding,
                });
            }
        };
        self.outstanding -= 1;
        if let Err(violation) = try_signal("on_next", || subscriber.on_next(element)) {
            self.fail_with(violation);
        }
        Ok(())
    }

    /// Normal completion; idempotent.
    pub fn complete(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = OutputState::Completed;
        self.shutdown_exposed(ShutdownReason::Normal);
        if let Some(subscriber) = self.subscriber.take() {
            let _ = try_signal("on_complete", || subscriber.on_complete());
        }
    }

    /// Failure; idempotent.
    ///
    /// The consumer is told unless the cause is its own violation.
    pub fn fail_with(&mut self, cause: BridgeError) {
        if self.is_closed() {
            return;
        }
        self.state = OutputState::Completed;
        self.failure = Some(cause.clone());
        self.shutdown_exposed(ShutdownReason::Failed(cause.clone()));
        if let Some(subscriber) = self.subscriber.take() {
            if !cause.is_consumer_violation() {
                let _ = try_signal("on_error", || subscriber.on_error(cause));
            }
        }
    }

    /// Outstanding demand is positive.
    #[inline]
    pub fn has_demand(&self) -> bool {
        self.outstanding > 0
    }

    /// Outstanding demand.
    #[inline]
    pub fn outstanding(&self) -> i64 {
        self.outstanding
    }

    /// Completed, failed or cancelled.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state == OutputState::Completed
    }

    /// A consumer is currently bound.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.subscriber.is_some()
    }

    /// The failure the ledger terminated with, if any.
    #[inline]
    pub fn failure(&self) -> Option<&BridgeError> {
        self.failure.as_ref()
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> OutputState {
        self.state
    }

    fn bind(&mut self, candidate: Arc<dyn Subscriber<T>>) {
        self.ever_bound = true;
        self.subscriber = Some(Arc::clone(&candidate));
        let subscription = match &self.exposed {
            Some(e) => Arc::new(DownstreamSubscription::new(e.mailbox().clone())),
            None => return,
        };
        if let Err(violation) = try_signal("on_subscribe", || candidate.on_subscribe(subscription)) {
            self.fail_with(violation);
        }
    }

    fn shutdown_exposed(&self, reason: ShutdownReason) {
        if let Some(exposed) = &self.exposed {
            exposed.shutdown(reason);
        }
    }
}
