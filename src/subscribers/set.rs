//! # SubscriberSet: non-blocking fan-out over multiple observers
//!
//! [`SubscriberSet`] distributes each [`Event`] to every observer **without awaiting**
//! their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-observer FIFO (queue order).
//! - Panics inside observers are caught and reported as `SubscriberPanicked`.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different observers.
//! - No retries on queue overflow (the event is dropped for that observer and
//!   `SubscriberOverflow` is published).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per observer)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out with per-observer bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per observer.
    ///
    /// Must be called inside a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = panic.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fans out one event to all observers (non-blocking).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Fans out a pre-allocated event.
    ///
    /// A full or closed queue drops the event for that observer and publishes
    /// `SubscriberOverflow`, unless the event is itself an overflow report.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow = event.kind == EventKind::SubscriberOverflow;

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes all queues and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().expect("events").push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &Event) {
            panic!("observer blew up");
        }
        fn name(&self) -> &'static str {
            "explode"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_to_every_observer() {
        let a = Arc::new(Collect::default());
        let b = Arc::new(Collect::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![a.clone(), b.clone()];
        let set = SubscriberSet::new(subs, Bus::new(8));
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::BridgeStarted));
        set.emit(&Event::new(EventKind::BridgeFinished));
        set.shutdown().await;

        let expected = vec![EventKind::BridgeStarted, EventKind::BridgeFinished];
        assert_eq!(*a.0.lock().expect("events"), expected);
        assert_eq!(*b.0.lock().expect("events"), expected);
    }

    #[tokio::test]
    async fn observer_panic_is_reported_on_bus() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Explode)];
        let set = SubscriberSet::new(subs, bus);

        set.emit(&Event::new(EventKind::BridgeStarted));
        set.shutdown().await;

        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.reason.as_deref(), Some("observer blew up"));
    }
}
