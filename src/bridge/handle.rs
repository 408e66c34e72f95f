//! # Processor handle: the bridge as seen by both neighbours.
//!
//! [`ProcessorHandle`] is a [`Subscriber`] towards the upstream producer and a
//! [`Publisher`] towards the downstream consumer. It holds no state besides the
//! mailbox: every inbound signal is forwarded as exactly one message.
//!
//! ```text
//! upstream ── on_subscribe/on_next/on_error/on_complete ──┐
//!                                                         ├──► mailbox ──► worker
//! downstream ── subscribe ──► ExposedPublisher ───────────┤
//! downstream ── request/cancel ──► DownstreamSubscription ┘
//! ```
//!
//! Signals sent after the worker stopped are dropped, except an upstream
//! `on_subscribe`, whose subscription is cancelled right away.
//!
//! Handles own the mailbox: once the last clone is dropped the worker sees its mailbox
//! close and terminates. The consumer's [`DownstreamSubscription`] only holds a weak
//! sender.

use std::sync::Arc;

use tokio::sync::mpsc::error::SendError;

use crate::bridge::envelope::{DownstreamSignal, Envelope, Mailbox, UpstreamSignal, WeakMailbox};
use crate::bridge::exposed::{ExposedPublisher, ShutdownReason};
use crate::error::BridgeError;
use crate::protocol::{Publisher, Subscriber, Subscription};

/// Externally visible Publisher + Subscriber of one bridge worker.
pub struct ProcessorHandle<T> {
    name: Arc<str>,
    mailbox: Mailbox<T>,
    exposed: Arc<ExposedPublisher<T>>,
}

impl<T> Clone for ProcessorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            mailbox: self.mailbox.clone(),
            exposed: Arc::clone(&self.exposed),
        }
    }
}

impl<T: Send + 'static> ProcessorHandle<T> {
    pub(crate) fn new(
        name: Arc<str>,
        mailbox: Mailbox<T>,
        exposed: Arc<ExposedPublisher<T>>,
    ) -> Self {
        Self {
            name,
            mailbox,
            exposed,
        }
    }

    /// Bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Final state of the producer side, once the worker terminated.
    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.exposed.shutdown_reason()
    }

    /// Returns `true` once the worker stopped (its mailbox is closed).
    pub fn is_terminated(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Shared handle usable as `Arc<dyn Subscriber<T>>` for an upstream publisher.
    pub fn as_subscriber(&self) -> Arc<dyn Subscriber<T>> {
        Arc::new(self.clone())
    }

    /// Shared handle usable as `Arc<dyn Publisher<T>>` for downstream wiring.
    pub fn as_publisher(&self) -> Arc<dyn Publisher<T>> {
        Arc::new(self.clone())
    }

    fn post_upstream(&self, signal: UpstreamSignal<T>) {
        if let Err(SendError(Envelope::Upstream(UpstreamSignal::OnSubscribe(sub)))) =
            self.mailbox.send(Envelope::Upstream(signal))
        {
            sub.cancel();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for ProcessorHandle<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.post_upstream(UpstreamSignal::OnSubscribe(subscription));
    }

    fn on_next(&self, element: T) {
        self.post_upstream(UpstreamSignal::OnNext(element));
    }

    fn on_error(&self, cause: BridgeError) {
        self.post_upstream(UpstreamSignal::OnError(cause));
    }

    fn on_complete(&self) {
        self.post_upstream(UpstreamSignal::OnComplete);
    }
}

impl<T: Send + 'static> Publisher<T> for ProcessorHandle<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.exposed.subscribe(subscriber);
    }
}

/// Subscription handed to the bound downstream consumer.
pub(crate) struct DownstreamSubscription<T> {
    mailbox: WeakMailbox<T>,
}

impl<T: Send + 'static> DownstreamSubscription<T> {
    pub(crate) fn new(mailbox: WeakMailbox<T>) -> Self {
        Self { mailbox }
    }

    fn post(&self, signal: DownstreamSignal) {
        if let Some(tx) = self.mailbox.upgrade() {
            let _ = tx.send(Envelope::Downstream(signal));
        }
    }
}

impl<T: Send + 'static> Subscription for DownstreamSubscription<T> {
    fn request(&self, n: i64) {
        self.post(DownstreamSignal::Request(n));
    }

    fn cancel(&self) {
        self.post(DownstreamSignal::Cancel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::envelope::mailbox;
    use crate::testing::RecordingSubscription;

    fn handle() -> (
        ProcessorHandle<u32>,
        crate::bridge::envelope::MailboxRx<u32>,
    ) {
        let (tx, rx) = mailbox::<u32>();
        let exposed = ExposedPublisher::new(&tx);
        (ProcessorHandle::new("h".into(), tx, exposed), rx)
    }

    #[test]
    fn each_signal_becomes_one_message_in_order() {
        let (h, mut rx) = handle();
        h.on_subscribe(RecordingSubscription::new());
        h.on_next(1);
        h.on_next(2);
        h.on_complete();

        let mut seen = Vec::new();
        while let Ok(Envelope::Upstream(sig)) = rx.try_recv() {
            seen.push(match sig {
                UpstreamSignal::OnNext(v) => format!("next:{v}"),
                other => other.as_str().to_string(),
            });
        }
        assert_eq!(seen, ["on_subscribe", "next:1", "next:2", "on_complete"]);
    }

    #[test]
    fn late_upstream_subscription_is_cancelled() {
        let (h, rx) = handle();
        drop(rx);
        let sub = RecordingSubscription::new();
        h.on_subscribe(sub.clone());
        assert!(sub.is_cancelled());
        assert!(h.is_terminated());
    }

    #[test]
    fn downstream_subscription_posts_request_and_cancel() {
        let (tx, mut rx) = mailbox::<u32>();
        let s = DownstreamSubscription::new(tx.downgrade());
        s.request(5);
        s.cancel();
        assert!(matches!(
            rx.try_recv(),
            Ok(Envelope::Downstream(DownstreamSignal::Request(5)))
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(Envelope::Downstream(DownstreamSignal::Cancel))
        ));
    }

    #[test]
    fn downstream_subscription_does_not_keep_mailbox_open() {
        let (h, mut rx) = handle();
        let s = DownstreamSubscription::new(h.exposed.mailbox().clone());
        drop(h);
        s.request(1);
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
