//! Mailbox messages delivered to a bridge worker.
//!
//! Every inbound protocol signal becomes exactly one [`Envelope`]. The mailbox is an
//! unbounded `tokio::sync::mpsc` channel: sending never blocks the protocol caller and
//! messages from one sender are received in the order they were sent.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bridge::ExposedPublisher;
use crate::error::BridgeError;
use crate::protocol::Subscription;

/// Signals from the upstream producer the bridge consumes.
pub enum UpstreamSignal<T> {
    /// Upstream granted a subscription.
    OnSubscribe(Arc<dyn Subscription>),
    /// One element.
    OnNext(T),
    /// Upstream failed.
    OnError(BridgeError),
    /// Upstream finished.
    OnComplete,
}

impl<T> UpstreamSignal<T> {
    /// Signal name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamSignal::OnSubscribe(_) => "on_subscribe",
            UpstreamSignal::OnNext(_) => "on_next",
            UpstreamSignal::OnError(_) => "on_error",
            UpstreamSignal::OnComplete => "on_complete",
        }
    }
}

/// Signals from the downstream side the bridge serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamSignal {
    /// New subscribers are waiting in the exposed publisher.
    SubscribePending,
    /// The bound consumer asked for more elements.
    Request(i64),
    /// The bound consumer cancelled.
    Cancel,
}

impl DownstreamSignal {
    /// Signal name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DownstreamSignal::SubscribePending => "subscribe",
            DownstreamSignal::Request(_) => "request",
            DownstreamSignal::Cancel => "cancel",
        }
    }
}

/// One mailbox message.
pub(crate) enum Envelope<T> {
    /// Installs the exposed producer object; always the first message.
    Expose(Arc<ExposedPublisher<T>>),
    /// Consumer-role signal.
    Upstream(UpstreamSignal<T>),
    /// Producer-role signal.
    Downstream(DownstreamSignal),
}

/// Sending half of a worker mailbox.
pub(crate) type Mailbox<T> = mpsc::UnboundedSender<Envelope<T>>;

/// Non-owning sending half; does not keep the worker alive.
pub(crate) type WeakMailbox<T> = mpsc::WeakUnboundedSender<Envelope<T>>;

/// Receiving half of a worker mailbox.
pub(crate) type MailboxRx<T> = mpsc::UnboundedReceiver<Envelope<T>>;

/// Creates a new mailbox.
pub(crate) fn mailbox<T>() -> (Mailbox<T>, MailboxRx<T>) {
    mpsc::unbounded_channel()
}
