//! # Pull-based streaming contract.
//!
//! The three roles of the Publisher / Subscriber / Subscription protocol:
//!
//! - [`Publisher`] accepts a [`Subscriber`] and later serves it;
//! - [`Subscriber`] receives `on_subscribe` first, then any number of `on_next`,
//!   then at most one terminal `on_error` / `on_complete`;
//! - [`Subscription`] is the back-channel: `request(n)` authorizes `n` more elements,
//!   `cancel()` asks the publisher to stop.
//!
//! ## Rules
//! ```text
//! subscribe(s) ──► on_subscribe(sub) ──► [request(n) ──► on_next ≤ n]* ──► on_complete | on_error
//!                                     └─► cancel() ──► (eventually) silence
//! ```
//! - `request(n)` with `n < 1` is a protocol violation, answered with `on_error`.
//! - No signal follows `on_complete` / `on_error`.
//! - Signals to one subscriber are never concurrent.
//!
//! All methods are synchronous and must not block: implementations hand work off
//! (for this crate, by posting a message to a worker mailbox) and return.

use std::sync::Arc;

use crate::error::BridgeError;

/// Back-channel from a subscriber to the publisher serving it.
pub trait Subscription: Send + Sync + 'static {
    /// Authorizes the publisher to send up to `n` more elements.
    fn request(&self, n: i64);

    /// Asks the publisher to stop sending and release resources.
    fn cancel(&self);
}

/// Receiver side of the contract.
pub trait Subscriber<T>: Send + Sync + 'static {
    /// Called exactly once, before any other signal.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Delivers one element (never more than requested).
    fn on_next(&self, element: T);

    /// Terminal failure signal.
    fn on_error(&self, cause: BridgeError);

    /// Terminal success signal.
    fn on_complete(&self);
}

/// Producer side of the contract.
pub trait Publisher<T>: Send + Sync + 'static {
    /// Requests that this publisher start serving `subscriber`.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

/// Subscription handed to parties that are rejected before they could be served.
///
/// Both operations are no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancelledSubscription;

impl Subscription for CancelledSubscription {
    fn request(&self, _n: i64) {}

    fn cancel(&self) {}
}

impl CancelledSubscription {
    /// Returns a shared handle, ready to pass to [`Subscriber::on_subscribe`].
    #[must_use]
    pub fn arc() -> Arc<dyn Subscription> {
        Arc::new(Self)
    }
}
