//! # streambridge
//!
//! **streambridge** connects an async worker to pull-based `Publisher`/`Subscriber`
//! streams with bounded buffering and explicit demand.
//!
//! Each bridge is both a [`Subscriber`] towards an upstream producer and a [`Publisher`]
//! towards exactly one downstream consumer. Elements are buffered in a fixed-size ring
//! and forwarded only while the consumer has outstanding demand; the upstream is asked
//! for more in batches as the ring drains.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  upstream Publisher                                  downstream Subscriber
//!        │ on_subscribe/on_next/                                ▲ on_next/on_error/
//!        │ on_error/on_complete                                 │ on_complete
//!        ▼                                                      │
//! ┌──────────────────────── ProcessorHandle<T> ─────────────────┴──────────────┐
//! │  Subscriber<T>  ──────────┐                 ┌────────── Publisher<T>       │
//! │                           ▼                 ▼          (ExposedPublisher)  │
//! │                     mailbox (unbounded mpsc, in order)                     │
//! └───────────────────────────────────┬────────────────────────────────────────┘
//!                                     ▼
//! ┌──────────────────── BridgeActor (one tokio task per bridge) ───────────────┐
//! │  Coordinator                                                               │
//! │   ├─ BatchingInputBuffer   ring of `capacity`, re-requests capacity/2      │
//! │   ├─ DemandLedger          single consumer, outstanding demand             │
//! │   └─ pump                  moves elements while data && demand             │
//! └───────────────────────────────────┬────────────────────────────────────────┘
//!                                     │ publishes Events
//!                                     ▼
//!                       Bus (broadcast) ─► Host listener ─► AliveTracker
//!                                                       └─► SubscriberSet ─► observers
//! ```
//!
//! ### Lifecycle
//! ```text
//! Host::spawn_bridge() ──► BridgeStarted
//!   upstream grant     ──► request(capacity)                    UpstreamSubscribed
//!   consumer subscribe ──► bind first, refuse others            DownstreamSubscribed
//!   request(n)         ──► pump                                  (DemandRequested)
//!   exit:
//!     input drained or consumer cancelled  ─► on_complete       BridgeFinished
//!     upstream error / protocol violation  ─► on_error(cause)   BridgeFailed
//!     invariant violation                  ─► RestartPolicy     BridgeFailed (+ RestartRejected)
//!     Host::shutdown()                     ─► AbruptTermination BridgeAborted
//! ```
//!
//! ## Features
//! | Area               | Description                                               | Key types / traits                            |
//! |--------------------|-----------------------------------------------------------|-----------------------------------------------|
//! | **Protocol**       | Reactive-streams style contract.                          | [`Publisher`], [`Subscriber`], [`Subscription`] |
//! | **Bridge**         | Protocol facade of one worker.                            | [`ProcessorHandle`], [`ExposedPublisher`]     |
//! | **Flow control**   | Bounded input ring and downstream demand accounting.      | [`BatchingInputBuffer`], [`DemandLedger`]     |
//! | **Host**           | Spawning, event fan-out, graceful shutdown.               | [`Host`], [`HostBuilder`]                     |
//! | **Observer API**   | Hook into lifecycle events (logging, metrics).            | [`Subscribe`], [`Event`]                      |
//! | **Errors**         | Typed protocol, invariant and runtime errors.             | [`BridgeError`], [`RuntimeError`]             |
//! | **Configuration**  | Buffer size, diagnostics, grace, restart policy.          | [`Config`], [`RestartPolicy`]                 |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], an observer writing events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use streambridge::{
//!     BridgeError, CancelledSubscription, Config, Host, Publisher, Subscriber, Subscription,
//! };
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<u32>>);
//!
//! impl Subscriber<u32> for Collect {
//!     fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
//!         subscription.request(10);
//!     }
//!     fn on_next(&self, element: u32) {
//!         self.0.lock().unwrap().push(element);
//!     }
//!     fn on_error(&self, _cause: BridgeError) {}
//!     fn on_complete(&self) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Host::builder(Config::default()).build();
//!     let bridge = host.spawn_bridge::<u32>("numbers")?;
//!
//!     let sink = Arc::new(Collect::default());
//!     bridge.as_publisher().subscribe(sink.clone());
//!
//!     bridge.on_subscribe(CancelledSubscription::arc());
//!     for n in 1..=3 {
//!         bridge.on_next(n);
//!     }
//!     bridge.on_complete();
//!
//!     host.join().await;
//!     assert_eq!(*sink.0.lock().unwrap(), vec![1, 2, 3]);
//!     Ok(())
//! }
//! ```

mod bridge;
mod core;
mod error;
mod events;
mod input;
mod output;
mod policies;
mod protocol;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use bridge::{DownstreamSignal, ExposedPublisher, ProcessorHandle, ShutdownReason, UpstreamSignal};
pub use core::{Config, Host, HostBuilder, Termination};
pub use error::{BridgeError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use input::{BatchingInputBuffer, ErrorSink, InputState};
pub use output::{DemandLedger, OutputState, Registration};
pub use policies::RestartPolicy;
pub use protocol::{CancelledSubscription, Publisher, Subscriber, Subscription};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: built-in observer writing events through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
