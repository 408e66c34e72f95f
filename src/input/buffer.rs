//! # Batching input buffer.
//!
//! Fixed-capacity ring buffer filled by an upstream producer under an active
//! [`Subscription`]. Demand is re-requested in batches of half the capacity, so the
//! upstream never has more than `capacity` elements outstanding.
//!
//! ## State machine
//! ```text
//! AwaitingSubscription ──on_subscribe──► Running ──on_complete / on_error──► Completed
//!          │                                                                   ▲
//!          └──────────── on_complete / on_error / cancel ──────────────────────┘
//! ```
//!
//! ## Request accounting
//! ```text
//! grant:      request(capacity)
//! take_next:  batch_remaining -= 1
//!             batch_remaining == 0 ─► batch_remaining = batch
//!                                     request(batch) unless completed
//!             (batch = max(1, capacity / 2))
//! ```
//!
//! ## Rules
//! - `occupied <= capacity` always; an element arriving on a full buffer is an overrun.
//! - Once completed, elements are dropped and late subscriptions are cancelled.
//! - Upstream errors clear the buffer and are routed to the [`ErrorSink`].

use std::sync::Arc;

use crate::bridge::UpstreamSignal;
use crate::error::BridgeError;
use crate::protocol::Subscription;

/// Callback receiving upstream failures.
///
/// Installed at construction; the coordinator routes it into its shared failure path.
pub type ErrorSink = Box<dyn FnMut(BridgeError) + Send>;

/// Lifecycle of the input side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// No upstream subscription yet.
    AwaitingSubscription,
    /// Subscription granted; elements may arrive.
    Running,
    /// Upstream completed, failed or was cancelled.
    Completed,
}

impl InputState {
    fn as_str(&self) -> &'static str {
        match self {
            InputState::AwaitingSubscription => "awaiting upstream subscription",
            InputState::Running => "running",
            InputState::Completed => "completed",
        }
    }
}

/// Bounded ring buffer fed by the upstream producer.
pub struct BatchingInputBuffer<T> {
    slots: Box<[Option<T>]>,
    mask: usize,
    occupied: usize,
    cursor: usize,

    upstream_completed: bool,
    upstream: Option<Arc<dyn Subscription>>,

    batch_size: usize,
    batch_remaining: usize,
    requested_total: u64,

    state: InputState,
    on_error: ErrorSink,
}

impl<T> BatchingInputBuffer<T> {
    /// Creates an empty buffer.
    ///
    /// # Errors
    /// [`BridgeError::InvalidCapacity`] unless `capacity` is a non-zero power of two.
    pub fn new(capacity: usize, on_error: ErrorSink) -> Result<Self, BridgeError> {
        if !capacity.is_power_of_two() {
            return Err(BridgeError::InvalidCapacity { capacity });
        }
        let batch_size = (capacity / 2).max(1);
        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
            occupied: 0,
            cursor: 0,
            upstream_completed: false,
            upstream: None,
            batch_size,
            batch_remaining: batch_size,
            requested_total: 0,
            state: InputState::AwaitingSubscription,
            on_error,
        })
    }

    /// Routes one upstream signal according to the current state.
    ///
    /// # Errors
    /// Invariant violations: a second grant while running, an element before any grant,
    /// or an element arriving on a full buffer.
    pub fn handle(&mut self, signal: UpstreamSignal<T>) -> Result<(), BridgeError> {
        match (self.state, signal) {
            (InputState::AwaitingSubscription, UpstreamSignal::OnSubscribe(sub)) => {
                self.on_subscription_granted(sub)
            }
            (InputState::AwaitingSubscription, UpstreamSignal::OnNext(_)) => {
                Err(BridgeError::UnexpectedMessage {
                    message: "on_next",
                    state: self.state.as_str(),
                })
            }
            (InputState::Running, UpstreamSignal::OnNext(element)) => {
                self.on_element_arrived(element)
            }
            (InputState::Running, UpstreamSignal::OnSubscribe(sub)) => {
                sub.cancel();
                Err(BridgeError::DuplicateSubscription)
            }
            (InputState::Completed, UpstreamSignal::OnSubscribe(sub)) => {
                sub.cancel();
                Ok(())
            }
            (InputState::Completed, UpstreamSignal::OnNext(_)) => Ok(()),
            (InputState::Completed, UpstreamSignal::OnComplete | UpstreamSignal::OnError(_)) => {
                Ok(())
            }
            (_, UpstreamSignal::OnComplete) => {
                self.on_upstream_completed();
                Ok(())
            }
            (_, UpstreamSignal::OnError(cause)) => {
                self.on_upstream_error(cause);
                Ok(())
            }
        }
    }

    /// Stores the granted subscription and requests a full buffer.
    ///
    /// # Errors
    /// [`BridgeError::DuplicateSubscription`] when already running. A grant after
    /// completion is cancelled and accepted as a no-op.
    pub fn on_subscription_granted(
        &mut self,
        subscription: Arc<dyn Subscription>,
    ) -> Result<(), BridgeError> {
        match self.state {
            InputState::AwaitingSubscription => {
                self.request_upstream(&subscription, self.slots.len());
                self.upstream = Some(subscription);
                self.state = InputState::Running;
                Ok(())
            }
            InputState::Running => {
                subscription.cancel();
                Err(BridgeError::DuplicateSubscription)
            }
            InputState::Completed => {
                subscription.cancel();
                Ok(())
            }
        }
    }

    /// Stores one element at the tail of the ring.
    ///
    /// # Errors
    /// [`BridgeError::BufferOverrun`] when the upstream sent more than it was granted.
    pub fn on_element_arrived(&mut self, element: T) -> Result<(), BridgeError> {
        if self.is_closed() {
            return Ok(());
        }
        if self.occupied == self.slots.len() {
            return Err(BridgeError::BufferOverrun {
                capacity: self.slots.len(),
            });
        }
        let idx = (self.cursor + self.occupied) & self.mask;
        self.slots[idx] = Some(element);
        self.occupied += 1;
        Ok(())
    }

    /// Marks the upstream as completed; buffered elements stay available.
    pub fn on_upstream_completed(&mut self) {
        self.upstream_completed = true;
        self.upstream = None;
        self.state = InputState::Completed;
    }

    /// Marks the upstream as failed, drops buffered elements and notifies the sink.
    pub fn on_upstream_error(&mut self, cause: BridgeError) {
        self.upstream_completed = true;
        self.upstream = None;
        self.clear();
        self.state = InputState::Completed;
        (self.on_error)(cause);
    }

    /// Removes and returns the oldest buffered element, re-requesting a batch when due.
    ///
    /// # Errors
    /// [`BridgeError::BufferUnderrun`] when nothing is buffered.
    pub fn take_next(&mut self) -> Result<T, BridgeError> {
        if self.occupied == 0 {
            return Err(BridgeError::BufferUnderrun);
        }
        let element = self.slots[self.cursor]
            .take()
            .ok_or(BridgeError::BufferUnderrun)?;
        self.cursor = (self.cursor + 1) & self.mask;
        self.occupied -= 1;

        self.batch_remaining -= 1;
        if self.batch_remaining == 0 {
            self.batch_remaining = self.batch_size;
            if !self.upstream_completed {
                if let Some(upstream) = self.upstream.clone() {
                    self.request_upstream(&upstream, self.batch_size);
                }
            }
        }
        Ok(element)
    }

    /// Stops consuming: cancels the subscription and drops buffered elements.
    ///
    /// Idempotent; a no-op once the upstream completed.
    pub fn cancel(&mut self) {
        if !self.upstream_completed {
            self.upstream_completed = true;
            if let Some(upstream) = self.upstream.take() {
                upstream.cancel();
            }
            self.clear();
        }
        self.state = InputState::Completed;
    }

    /// At least one element is buffered.
    #[inline]
    pub fn has_available(&self) -> bool {
        self.occupied > 0
    }

    /// Upstream is done and every buffered element has been taken.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.upstream_completed && self.occupied == 0
    }

    /// Upstream completed, failed or was cancelled.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.upstream_completed
    }

    /// Number of buffered elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` when nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Size of each re-request batch.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total number of elements requested from upstream so far.
    #[inline]
    pub fn requested_total(&self) -> u64 {
        self.requested_total
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> InputState {
        self.state
    }

    fn request_upstream(&mut self, upstream: &Arc<dyn Subscription>, n: usize) {
        self.requested_total = self.requested_total.saturating_add(n as u64);
        upstream.request(i64::try_from(n).unwrap_or(i64::MAX));
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.occupied = 0;
        self.cursor = 0;
    }
}
