//! # Runtime events emitted by the host and bridge workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Bridge lifecycle**: worker start, upstream/downstream attachment, termination
//! - **Flow-control diagnostics**: demand and element traffic (only with `Config::debug`)
//! - **Observer events**: overflow/panic inside event subscribers
//! - **Shutdown events**: host-wide graceful shutdown progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps, bridge name,
//! reasons and demand figures.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use streambridge::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DemandRequested)
//!     .with_bridge("orders")
//!     .with_demand(16);
//!
//! assert_eq!(ev.kind, EventKind::DemandRequested);
//! assert_eq!(ev.bridge.as_deref(), Some("orders"));
//! assert_eq!(ev.demand, Some(16));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::BridgeError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Bridge lifecycle ===
    /// Worker spawned and its exposed publisher installed.
    ///
    /// Sets: `bridge`, `capacity`
    BridgeStarted,

    /// Upstream granted a subscription; the initial full-buffer request was issued.
    ///
    /// Sets: `bridge`, `demand` (initial request)
    UpstreamSubscribed,

    /// A downstream consumer was bound.
    ///
    /// Sets: `bridge`
    DownstreamSubscribed,

    /// A downstream consumer was refused (second subscriber or late subscriber).
    ///
    /// Sets: `bridge`, `reason`
    SubscriberRejected,

    /// Upstream signalled completion.
    ///
    /// Sets: `bridge`
    UpstreamCompleted,

    /// Upstream signalled an error.
    ///
    /// Sets: `bridge`, `reason`
    UpstreamFailed,

    /// Downstream cancelled its subscription.
    ///
    /// Sets: `bridge`
    DownstreamCancelled,

    /// Worker drained and stopped normally.
    ///
    /// Sets: `bridge`
    BridgeFinished,

    /// Worker stopped with a failure.
    ///
    /// Sets: `bridge`, `reason`
    BridgeFailed,

    /// Worker was stopped by the host before completing.
    ///
    /// Sets: `bridge`
    BridgeAborted,

    /// Host attempted a restart; the worker refused and died.
    ///
    /// Sets: `bridge`, `reason`
    RestartRejected,

    // === Flow-control diagnostics (debug only) ===
    /// Downstream requested more elements.
    ///
    /// Sets: `bridge`, `demand` (requested amount)
    DemandRequested,

    /// Input buffer issued a batch re-request upstream.
    ///
    /// Sets: `bridge`, `demand` (batch size)
    BatchRequested,

    /// One element was moved from input to output.
    ///
    /// Sets: `bridge`, `demand` (outstanding after emit)
    ElementEmitted,

    // === Observer events ===
    /// Event subscriber panicked during event processing.
    ///
    /// Sets: `bridge` (subscriber name), `reason`
    SubscriberPanicked,

    /// Event subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `bridge` (subscriber name), `reason`
    SubscriberOverflow,

    // === Shutdown events ===
    /// Host shutdown requested (explicit call or OS signal).
    ShutdownRequested,

    /// All bridges stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some bridges did not stop in time.
    GraceExceeded,
}

impl EventKind {
    /// Terminal worker states.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::BridgeFinished
                | EventKind::BridgeFailed
                | EventKind::BridgeAborted
                | EventKind::RestartRejected
        )
    }

    /// Events only published when `Config::debug` is enabled.
    #[inline]
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            EventKind::DemandRequested | EventKind::BatchRequested | EventKind::ElementEmitted
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the bridge (or subscriber), if applicable.
    pub bridge: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Stable error label, set together with `reason` for bridge failures.
    pub label: Option<&'static str>,
    /// Demand figure (requested amount, batch size or outstanding).
    pub demand: Option<i64>,
    /// Input buffer capacity.
    pub capacity: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            bridge: None,
            reason: None,
            label: None,
            demand: None,
            capacity: None,
        }
    }

    /// Attaches a bridge name.
    #[inline]
    pub fn with_bridge(mut self, bridge: impl Into<Arc<str>>) -> Self {
        self.bridge = Some(bridge.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an error as reason plus its stable label.
    #[inline]
    pub fn with_error(mut self, err: &BridgeError) -> Self {
        self.reason = Some(err.to_string().into());
        self.label = Some(err.as_label());
        self
    }

    /// Attaches a demand figure.
    #[inline]
    pub fn with_demand(mut self, n: i64) -> Self {
        self.demand = Some(n);
        self
    }

    /// Attaches the input buffer capacity.
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_bridge(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_bridge(subscriber)
            .with_reason(info)
    }
}
