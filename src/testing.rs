//! Recording protocol parties shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::BridgeError;
use crate::protocol::{Subscriber, Subscription};

/// Subscription that records every `request` and counts `cancel` calls.
#[derive(Default)]
pub(crate) struct RecordingSubscription {
    requests: Mutex<Vec<i64>>,
    cancels: AtomicUsize,
}

impl RecordingSubscription {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn requests(&self) -> Vec<i64> {
        self.requests.lock().expect("requests").clone()
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_count() > 0
    }
}

impl Subscription for RecordingSubscription {
    fn request(&self, n: i64) {
        self.requests.lock().expect("requests").push(n);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// One observed downstream signal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Signal<T> {
    Subscribed,
    Next(T),
    Error(BridgeError),
    Complete,
}

/// Consumer that records every signal it receives, in order.
pub(crate) struct RecordingSubscriber<T> {
    signals: Mutex<Vec<Signal<T>>>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    changed: Notify,
}

impl<T: Clone + Send + 'static> RecordingSubscriber<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            signals: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
            changed: Notify::new(),
        })
    }

    pub(crate) fn signals(&self) -> Vec<Signal<T>> {
        self.signals.lock().expect("signals").clone()
    }

    pub(crate) fn elements(&self) -> Vec<T> {
        self.signals()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Next(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn terminal(&self) -> Option<Signal<T>> {
        self.signals()
            .into_iter()
            .find(|s| matches!(s, Signal::Error(_) | Signal::Complete))
    }

    pub(crate) fn error(&self) -> Option<BridgeError> {
        match self.terminal() {
            Some(Signal::Error(e)) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.subscription.lock().expect("subscription").is_some()
    }

    pub(crate) fn request(&self, n: i64) {
        let sub = self.subscription.lock().expect("subscription").clone();
        sub.expect("subscribed before request").request(n);
    }

    pub(crate) fn cancel(&self) {
        let sub = self.subscription.lock().expect("subscription").clone();
        sub.expect("subscribed before cancel").cancel();
    }

    /// Waits until `pred` holds over the recorded signals (bounded by a test timeout).
    pub(crate) async fn wait_until(&self, pred: impl Fn(&[Signal<T>]) -> bool) {
        let wait = async {
            loop {
                let notified = self.changed.notified();
                if pred(&self.signals.lock().expect("signals")) {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("condition not reached in time");
    }

    pub(crate) async fn wait_terminal(&self) {
        self.wait_until(|s| {
            s.iter()
                .any(|s| matches!(s, Signal::Error(_) | Signal::Complete))
        })
        .await;
    }

    pub(crate) async fn wait_elements(&self, n: usize) {
        self.wait_until(|s| s.iter().filter(|s| matches!(s, Signal::Next(_))).count() >= n)
            .await;
    }

    fn record(&self, signal: Signal<T>) {
        self.signals.lock().expect("signals").push(signal);
        self.changed.notify_waiters();
    }
}

impl<T: Clone + Send + 'static> Subscriber<T> for RecordingSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock().expect("subscription") = Some(subscription);
        self.record(Signal::Subscribed);
    }

    fn on_next(&self, element: T) {
        self.record(Signal::Next(element));
    }

    fn on_error(&self, cause: BridgeError) {
        self.record(Signal::Error(cause));
    }

    fn on_complete(&self) {
        self.record(Signal::Complete);
    }
}
