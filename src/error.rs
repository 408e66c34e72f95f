//! Error types used by bridge workers and the host runtime.
//!
//! This module defines two main error enums:
//!
//! - [`BridgeError`]: failures of a single bridge worker (protocol violations,
//!   flow-control invariant violations, upstream failures, abrupt termination).
//! - [`RuntimeError`]: errors raised by the host runtime itself.
//!
//! Both provide `as_label` for logs/metrics. [`BridgeError`] additionally classifies
//! itself via [`BridgeError::is_protocol_violation`], [`BridgeError::is_invariant_violation`]
//! and [`BridgeError::is_consumer_violation`].

use std::time::Duration;
use thiserror::Error;

/// # Failures of a bridge worker.
///
/// A single cause is delivered to the downstream consumer, stored as the exposed
/// publisher's shutdown reason and published on the event bus, hence `Clone`.
///
/// ## Categories
/// - **Protocol violation**: a caller misused the streaming contract
///   (`NonPositiveRequest`, `DemandOverflow`, `MultipleSubscribers`, `SignalPanicked`).
/// - **Invariant violation**: flow-control bookkeeping is broken
///   (`BufferOverrun`, `BufferUnderrun`, `EmitWithoutDemand`, `UnexpectedMessage`,
///   `DuplicateSubscription`).
/// - **Upstream failure**: the consumed producer signalled `on_error`.
/// - **Lifecycle**: `AbruptTermination`, `WorkerPanicked`, `RestartForbidden`,
///   `AlreadyTerminated`.
/// - **Configuration**: `InvalidCapacity`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Downstream asked for fewer than one element.
    #[error("number of elements in request must be positive, got {requested}")]
    NonPositiveRequest {
        /// The offending request value.
        requested: i64,
    },

    /// Accumulated downstream demand would exceed `i64::MAX`.
    #[error("total pending demand must not exceed i64::MAX (outstanding={outstanding}, requested={requested})")]
    DemandOverflow {
        /// Demand before the request.
        outstanding: i64,
        /// The request that overflowed.
        requested: i64,
    },

    /// A second subscriber tried to attach to a bridge that already has one.
    #[error("only a single subscriber is supported")]
    MultipleSubscribers,

    /// A downstream callback panicked while being signalled.
    #[error("subscriber panicked in {signal}: {info}")]
    SignalPanicked {
        /// Signal being delivered (`on_subscribe`, `on_next`, ...).
        signal: &'static str,
        /// Panic payload rendered as text.
        info: String,
    },

    /// Upstream pushed more elements than were requested.
    #[error("input buffer overrun (capacity {capacity})")]
    BufferOverrun {
        /// Buffer capacity.
        capacity: usize,
    },

    /// An element was taken from an empty input buffer.
    #[error("input buffer underrun")]
    BufferUnderrun,

    /// An element was emitted without outstanding demand, or after completion.
    #[error("emit without downstream demand (outstanding={outstanding})")]
    EmitWithoutDemand {
        /// Demand at the time of the attempt.
        outstanding: i64,
    },

    /// A message arrived in a lifecycle state that cannot accept it.
    #[error("unexpected {message} while {state}")]
    UnexpectedMessage {
        /// Message kind.
        message: &'static str,
        /// State it arrived in.
        state: &'static str,
    },

    /// Upstream granted a second subscription while one is active.
    #[error("upstream subscription granted twice")]
    DuplicateSubscription,

    /// Upstream producer failed.
    #[error("upstream failed: {error}")]
    Upstream {
        /// The upstream error message.
        error: String,
    },

    /// The host stopped the worker before it completed.
    #[error("bridge terminated abruptly")]
    AbruptTermination,

    /// The worker task panicked while handling a message.
    #[error("bridge worker panicked: {info}")]
    WorkerPanicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The host tried to restart a worker; buffered state cannot be resumed.
    #[error("bridge cannot be restarted after: {cause}")]
    RestartForbidden {
        /// The failure that triggered the restart attempt.
        cause: Box<BridgeError>,
    },

    /// A late subscriber reached a bridge that already shut down normally.
    #[error("bridge already terminated; cannot resubscribe")]
    AlreadyTerminated,

    /// Buffer capacity is zero or not a power of two.
    #[error("buffer capacity must be a non-zero power of two, got {capacity}")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },
}

impl BridgeError {
    /// Wraps an arbitrary upstream error.
    pub fn upstream(error: impl std::fmt::Display) -> Self {
        BridgeError::Upstream {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streambridge::BridgeError;
    ///
    /// let err = BridgeError::NonPositiveRequest { requested: 0 };
    /// assert_eq!(err.as_label(), "protocol_non_positive_request");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::NonPositiveRequest { .. } => "protocol_non_positive_request",
            BridgeError::DemandOverflow { .. } => "protocol_demand_overflow",
            BridgeError::MultipleSubscribers => "protocol_multiple_subscribers",
            BridgeError::SignalPanicked { .. } => "protocol_signal_panicked",
            BridgeError::BufferOverrun { .. } => "invariant_buffer_overrun",
            BridgeError::BufferUnderrun => "invariant_buffer_underrun",
            BridgeError::EmitWithoutDemand { .. } => "invariant_emit_without_demand",
            BridgeError::UnexpectedMessage { .. } => "invariant_unexpected_message",
            BridgeError::DuplicateSubscription => "invariant_duplicate_subscription",
            BridgeError::Upstream { .. } => "upstream_failed",
            BridgeError::AbruptTermination => "abrupt_termination",
            BridgeError::WorkerPanicked { .. } => "worker_panicked",
            BridgeError::RestartForbidden { .. } => "restart_forbidden",
            BridgeError::AlreadyTerminated => "already_terminated",
            BridgeError::InvalidCapacity { .. } => "config_invalid_capacity",
        }
    }

    /// Caller-side misuse of the streaming contract.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::NonPositiveRequest { .. }
                | BridgeError::DemandOverflow { .. }
                | BridgeError::MultipleSubscribers
                | BridgeError::SignalPanicked { .. }
        )
    }

    /// Broken flow-control bookkeeping (a bug, not external misbehavior).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::BufferOverrun { .. }
                | BridgeError::BufferUnderrun
                | BridgeError::EmitWithoutDemand { .. }
                | BridgeError::UnexpectedMessage { .. }
                | BridgeError::DuplicateSubscription
        )
    }

    /// Violation committed by the bound consumer itself while being signalled.
    ///
    /// Such causes are not echoed back to that consumer.
    ///
    /// # Example
    /// ```
    /// use streambridge::BridgeError;
    ///
    /// let panicked = BridgeError::SignalPanicked { signal: "on_next", info: "boom".into() };
    /// assert!(panicked.is_consumer_violation());
    ///
    /// // Bad demand is still reported to the consumer that requested it.
    /// assert!(!BridgeError::NonPositiveRequest { requested: 0 }.is_consumer_violation());
    /// ```
    pub fn is_consumer_violation(&self) -> bool {
        matches!(self, BridgeError::SignalPanicked { .. })
    }
}

/// # Errors produced by the host runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some bridges remained alive.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of bridges that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streambridge::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
