//! # Example: Range pipeline
//!
//! A counting producer feeds one bridge; a consumer pulls four elements at a time.
//! Lifecycle and flow-control events are written through `tracing`.
//!
//! ```text
//! RangePublisher ──► bridge "range" (capacity 8) ──► PrintSink (request 4, 4, ...)
//! ```
//!
//! Run with: `RUST_LOG=debug cargo run --example pipeline --features logging`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use streambridge::{
    BridgeError, Config, Host, LogWriter, Publisher, Subscribe, Subscriber, Subscription,
};
use tracing_subscriber::EnvFilter;

/// Emits `start..end` on demand, then completes.
struct RangePublisher {
    start: u64,
    end: u64,
}

impl Publisher<u64> for RangePublisher {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<u64>>) {
        let subscription = Arc::new(RangeSubscription {
            state: Mutex::new(RangeState {
                next: self.start,
                end: self.end,
                subscriber: Some(Arc::clone(&subscriber)),
            }),
        });
        subscriber.on_subscribe(subscription);
    }
}

struct RangeState {
    next: u64,
    end: u64,
    subscriber: Option<Arc<dyn Subscriber<u64>>>,
}

struct RangeSubscription {
    state: Mutex<RangeState>,
}

impl Subscription for RangeSubscription {
    fn request(&self, n: i64) {
        let mut st = self.state.lock().unwrap();
        let Some(subscriber) = st.subscriber.clone() else {
            return;
        };
        for _ in 0..n.max(0) {
            if st.next == st.end {
                break;
            }
            subscriber.on_next(st.next);
            st.next += 1;
        }
        if st.next == st.end {
            st.subscriber = None;
            subscriber.on_complete();
        }
    }

    fn cancel(&self) {
        self.state.lock().unwrap().subscriber = None;
    }
}

/// Prints elements and asks for the next chunk after each one is consumed.
struct PrintSink {
    chunk: i64,
    seen: AtomicU64,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl Subscriber<u64> for PrintSink {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        subscription.request(self.chunk);
        *self.subscription.lock().unwrap() = Some(subscription);
    }

    fn on_next(&self, element: u64) {
        println!("[sink] {element}");
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if seen % self.chunk as u64 == 0 {
            if let Some(sub) = self.subscription.lock().unwrap().as_ref() {
                sub.request(self.chunk);
            }
        }
    }

    fn on_error(&self, cause: BridgeError) {
        println!("[sink] failed: {cause}");
    }

    fn on_complete(&self) {
        println!("[sink] done after {} elements", self.seen.load(Ordering::SeqCst));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        buffer_capacity: 8,
        debug: true,
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let host = Host::builder(cfg).with_subscribers(subs).build();

    let bridge = host.spawn_bridge::<u64>("range")?;
    bridge.as_publisher().subscribe(Arc::new(PrintSink {
        chunk: 4,
        seen: AtomicU64::new(0),
        subscription: Mutex::new(None),
    }));
    RangePublisher { start: 0, end: 20 }.subscribe(bridge.as_subscriber());

    for termination in host.join().await {
        println!("[host] bridge ended: {termination:?}");
    }
    // Let the observer drain before exiting.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    Ok(())
}
