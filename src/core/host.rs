//! # Host: spawns bridge workers, fans out events, shuts everything down.
//!
//! The [`Host`] owns the event bus, the [`SubscriberSet`], the liveness tracker and a
//! root [`CancellationToken`]. Each bridge runs as its own tokio task with a child
//! token.
//!
//! ## High-level architecture
//! ```text
//! HostBuilder::build()
//!   └─► event listener: Bus.subscribe() ─► AliveTracker::update() ─► SubscriberSet::emit()
//!
//! Host::spawn_bridge::<T>(name)
//!   ├─► BridgeActor::new()          (Expose queued first)
//!   ├─► Bus.publish(BridgeStarted)
//!   └─► workers.spawn(actor.run(root_token.child_token()))
//!
//! Shutdown path:
//!   Host::shutdown() / run_until_signal()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► root_token.cancel()        → every worker aborts (AbruptTermination)
//!     └─► wait up to cfg.grace:
//!            ├─ all joined    → Bus.publish(AllStoppedWithin)
//!            └─ timeout       → Bus.publish(GraceExceeded)
//!                               RuntimeError::GraceExceeded { stuck }
//! ```
//!
//! ## Example
//! ```rust
//! use streambridge::{Config, Host};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Host::builder(Config::default()).build();
//!     let bridge = host.spawn_bridge::<u64>("numbers")?;
//!
//!     // wire `bridge.as_subscriber()` to an upstream publisher and
//!     // `bridge.as_publisher()` to a downstream consumer ...
//!     # let _ = bridge;
//!
//!     host.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::bridge::ProcessorHandle;
use crate::bridge::signal::panic_info;
use crate::core::actor::BridgeActor;
use crate::core::alive::AliveTracker;
use crate::core::builder::HostBuilder;
use crate::core::config::Config;
use crate::core::coordinator::Termination;
use crate::core::shutdown;
use crate::error::{BridgeError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;

/// Runs bridge workers and owns their shared infrastructure.
pub struct Host {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    alive: Arc<AliveTracker>,
    token: CancellationToken,
    listener: CancellationToken,
    workers: Mutex<JoinSet<Termination>>,
}

impl Host {
    /// Starts building a host.
    pub fn builder(cfg: Config) -> HostBuilder {
        HostBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        alive: Arc<AliveTracker>,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            alive,
            token: CancellationToken::new(),
            listener: CancellationToken::new(),
            workers: Mutex::new(JoinSet::new()),
        }
    }

    /// Subscribes to the bus and forwards events to the tracker and observers.
    pub(crate) fn spawn_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let alive = Arc::clone(&self.alive);
        let stop = self.listener.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => {
                            alive.update(&ev).await;
                            subs.emit(&ev);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
        });
    }

    /// Spawns a new bridge worker and returns its handle.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// - [`BridgeError::InvalidCapacity`] for an invalid `buffer_capacity`.
    /// - [`BridgeError::AlreadyTerminated`] once the host has been shut down.
    pub fn spawn_bridge<T: Send + 'static>(
        &self,
        name: impl Into<Arc<str>>,
    ) -> Result<ProcessorHandle<T>, BridgeError> {
        if self.token.is_cancelled() {
            return Err(BridgeError::AlreadyTerminated);
        }
        self.cfg.validate()?;
        let name: Arc<str> = name.into();
        let (actor, handle) = BridgeActor::<T>::new(Arc::clone(&name), &self.cfg, self.bus.clone())?;

        self.bus.publish(
            Event::new(EventKind::BridgeStarted)
                .with_bridge(name)
                .with_capacity(self.cfg.buffer_capacity),
        );
        self.workers().spawn(actor.run(self.token.child_token()));
        Ok(handle)
    }

    /// Event bus shared with every worker.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Host configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Names of bridges currently alive (eventually consistent).
    pub async fn alive(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// Returns `true` if the named bridge is alive (eventually consistent).
    pub async fn is_alive(&self, name: &str) -> bool {
        self.alive.is_alive(name).await
    }

    /// Waits until every spawned bridge stopped on its own.
    ///
    /// Returns how each one ended, in completion order.
    pub async fn join(&self) -> Vec<Termination> {
        self.drain(&mut JoinSet::new()).await
    }

    /// Aborts every bridge and waits up to `grace` for them to stop.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] with the bridges still alive after `grace`.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.shutdown_with(&mut JoinSet::new()).await
    }

    /// Runs until all bridges stop, or until a termination signal triggers
    /// [`shutdown`](Self::shutdown).
    ///
    /// If signal handlers cannot be installed, waits for the bridges only.
    ///
    /// # Errors
    /// Same as [`shutdown`](Self::shutdown).
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let mut set = JoinSet::new();
        let signalled = tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => res.is_ok(),
            _ = self.drain(&mut set) => return Ok(()),
        };
        if !signalled {
            self.drain(&mut set).await;
            return Ok(());
        }
        self.shutdown_with(&mut set).await
    }

    async fn shutdown_with(&self, set: &mut JoinSet<Termination>) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.drain(set)).await {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot().await;
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Joins `set`, then any worker spawned meanwhile, until none is left.
    ///
    /// A worker task that died without reporting counts as failed (panic) or aborted.
    async fn drain(&self, set: &mut JoinSet<Termination>) -> Vec<Termination> {
        let mut done = Vec::new();
        loop {
            while let Some(res) = set.join_next().await {
                done.push(match res {
                    Ok(termination) => termination,
                    Err(err) if err.is_panic() => {
                        Termination::Failed(BridgeError::WorkerPanicked {
                            info: panic_info(err.into_panic().as_ref()),
                        })
                    }
                    Err(_) => Termination::Aborted,
                });
            }
            *set = std::mem::take(&mut *self.workers());
            if set.is_empty() {
                return done;
            }
        }
    }

    fn workers(&self) -> MutexGuard<'_, JoinSet<Termination>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.listener.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::bridge::ShutdownReason;
    use crate::protocol::{Publisher, Subscriber, Subscription};
    use crate::subscribers::Subscribe;
    use crate::testing::{RecordingSubscriber, RecordingSubscription, Signal};

    fn host(capacity: usize) -> Arc<Host> {
        Host::builder(Config {
            buffer_capacity: capacity,
            grace: Duration::from_secs(2),
            ..Config::default()
        })
        .build()
    }

    #[tokio::test]
    async fn four_elements_relay_in_order_then_complete() {
        let host = host(4);
        let bridge = host.spawn_bridge::<u32>("a").expect("spawn");
        let up = RecordingSubscription::new();
        let down = RecordingSubscriber::<u32>::new();

        bridge.as_publisher().subscribe(down.clone());
        bridge.on_subscribe(up.clone());
        for i in 1..=4 {
            bridge.on_next(i);
        }
        bridge.on_complete();

        down.wait_until(|s| s.contains(&Signal::Subscribed)).await;
        down.request(2);
        down.wait_elements(2).await;
        down.request(2);
        down.wait_terminal().await;

        assert_eq!(
            down.signals(),
            vec![
                Signal::Subscribed,
                Signal::Next(1),
                Signal::Next(2),
                Signal::Next(3),
                Signal::Next(4),
                Signal::Complete,
            ]
        );
        assert_eq!(up.requests(), vec![4]);
        assert_eq!(host.join().await, vec![Termination::Finished]);
        assert!(bridge.is_terminated());
    }

    #[tokio::test]
    async fn zero_request_fails_consumer_without_elements() {
        let host = host(2);
        let bridge = host.spawn_bridge::<u32>("b").expect("spawn");
        let up = RecordingSubscription::new();
        let down = RecordingSubscriber::<u32>::new();
        bridge.on_subscribe(up.clone());
        bridge.on_next(7);
        bridge.as_publisher().subscribe(down.clone());

        down.wait_until(|s| s.contains(&Signal::Subscribed)).await;
        down.request(0);
        down.wait_terminal().await;

        assert_eq!(
            down.error(),
            Some(BridgeError::NonPositiveRequest { requested: 0 })
        );
        assert!(down.elements().is_empty());
        assert_eq!(
            host.join().await,
            vec![Termination::Failed(BridgeError::NonPositiveRequest {
                requested: 0
            })]
        );
        assert!(up.is_cancelled());
    }

    #[tokio::test]
    async fn overrun_terminates_without_partial_delivery() {
        let host = host(8);
        let bridge = host.spawn_bridge::<u32>("c").expect("spawn");
        let down = RecordingSubscriber::<u32>::new();
        bridge.as_publisher().subscribe(down.clone());
        bridge.on_subscribe(RecordingSubscription::new());
        for i in 0..9 {
            bridge.on_next(i);
        }

        down.wait_terminal().await;
        assert_eq!(
            down.signals(),
            vec![
                Signal::Subscribed,
                Signal::Error(BridgeError::BufferOverrun { capacity: 8 })
            ]
        );
        assert_eq!(
            host.join().await,
            vec![Termination::Failed(BridgeError::BufferOverrun {
                capacity: 8
            })]
        );
    }

    #[tokio::test]
    async fn second_consumer_is_refused_and_never_sees_elements() {
        let host = host(4);
        let bridge = host.spawn_bridge::<u32>("d").expect("spawn");
        let first = RecordingSubscriber::<u32>::new();
        let second = RecordingSubscriber::<u32>::new();
        let publisher = bridge.as_publisher();
        publisher.subscribe(first.clone());
        publisher.subscribe(second.clone());

        bridge.on_subscribe(RecordingSubscription::new());
        bridge.on_next(1);
        second.wait_terminal().await;
        first.wait_until(|s| s.contains(&Signal::Subscribed)).await;
        first.request(1);
        first.wait_elements(1).await;

        assert_eq!(
            second.signals(),
            vec![
                Signal::Subscribed,
                Signal::Error(BridgeError::MultipleSubscribers)
            ]
        );
        assert_eq!(first.elements(), vec![1]);
        assert!(first.terminal().is_none());
        host.shutdown().await.expect("shutdown");
        assert_eq!(first.error(), Some(BridgeError::AbruptTermination));
    }

    #[tokio::test]
    async fn late_subscriber_after_completion_is_refused() {
        let host = host(2);
        let bridge = host.spawn_bridge::<u32>("late").expect("spawn");
        bridge.on_subscribe(RecordingSubscription::new());
        bridge.on_complete();
        assert_eq!(host.join().await, vec![Termination::Finished]);
        assert_eq!(bridge.shutdown_reason(), Some(ShutdownReason::Normal));

        let late = RecordingSubscriber::<u32>::new();
        bridge.as_publisher().subscribe(late.clone());
        assert_eq!(
            late.signals(),
            vec![
                Signal::Subscribed,
                Signal::Error(BridgeError::AlreadyTerminated)
            ]
        );
    }

    #[tokio::test]
    async fn shutdown_before_first_message_refuses_parked_subscriber() {
        let host = host(4);
        let bridge = host.spawn_bridge::<u32>("early").expect("spawn");
        let down = RecordingSubscriber::<u32>::new();
        bridge.as_publisher().subscribe(down.clone());

        host.shutdown().await.expect("shutdown");
        assert!(bridge.is_terminated());
        assert_eq!(
            bridge.shutdown_reason(),
            Some(ShutdownReason::Failed(BridgeError::AbruptTermination))
        );
        assert_eq!(
            down.signals(),
            vec![
                Signal::Subscribed,
                Signal::Error(BridgeError::AbruptTermination)
            ]
        );
    }

    #[tokio::test]
    async fn bridge_without_handles_stops_on_its_own() {
        let host = host(4);
        let bridge = host.spawn_bridge::<u32>("orphan").expect("spawn");
        drop(bridge);

        let ended = tokio::time::timeout(Duration::from_millis(500), host.join())
            .await
            .expect("join returns once the only handle is gone");
        assert_eq!(ended, vec![Termination::Aborted]);
    }

    #[tokio::test]
    async fn worker_task_panic_is_reported_as_failure() {
        fn lost() -> Termination {
            panic!("lost worker")
        }
        let host = host(4);
        host.workers().spawn(async { lost() });
        assert_eq!(
            host.join().await,
            vec![Termination::Failed(BridgeError::WorkerPanicked {
                info: "lost worker".into()
            })]
        );
    }

    #[tokio::test]
    async fn invalid_capacity_is_refused_at_spawn() {
        let host = host(3);
        assert!(matches!(
            host.spawn_bridge::<u32>("x"),
            Err(BridgeError::InvalidCapacity { capacity: 3 })
        ));
    }

    #[tokio::test]
    async fn spawn_after_shutdown_is_refused() {
        let host = host(2);
        host.shutdown().await.expect("shutdown");
        assert!(matches!(
            host.spawn_bridge::<u32>("x"),
            Err(BridgeError::AlreadyTerminated)
        ));
    }

    #[derive(Default)]
    struct Kinds(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().expect("kinds").push(ev.kind);
        }
    }

    #[tokio::test]
    async fn lifecycle_events_reach_observers() {
        let kinds = Arc::new(Kinds::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![kinds.clone()];
        let host = Host::builder(Config::default())
            .with_subscribers(subs)
            .build();
        let bridge = host.spawn_bridge::<u32>("events").expect("spawn");
        let mut rx = host.bus().subscribe();
        bridge.on_subscribe(RecordingSubscription::new());
        bridge.on_complete();
        host.join().await;

        while let Ok(ev) = rx.recv().await {
            if ev.kind == EventKind::BridgeFinished {
                break;
            }
        }
        for _ in 0..100 {
            if kinds.0.lock().expect("kinds").contains(&EventKind::BridgeFinished) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            *kinds.0.lock().expect("kinds"),
            vec![
                EventKind::BridgeStarted,
                EventKind::UpstreamSubscribed,
                EventKind::UpstreamCompleted,
                EventKind::BridgeFinished,
            ]
        );
        assert!(!host.is_alive("events").await);
    }

    /// Consumer whose `on_next` blocks its worker thread.
    struct Stall {
        entered: AtomicBool,
    }

    impl Subscriber<u32> for Stall {
        fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
            subscription.request(1);
        }
        fn on_next(&self, _element: u32) {
            self.entered.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
        }
        fn on_error(&self, _cause: BridgeError) {}
        fn on_complete(&self) {}
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stuck_bridge_exceeds_grace() {
        let host = Host::builder(Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        })
        .build();
        let bridge = host.spawn_bridge::<u32>("slow").expect("spawn");
        let stall = Arc::new(Stall {
            entered: AtomicBool::new(false),
        });
        bridge.as_publisher().subscribe(stall.clone());
        bridge.on_subscribe(RecordingSubscription::new());
        bridge.on_next(1);

        while !(stall.entered.load(Ordering::SeqCst) && host.is_alive("slow").await) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        match host.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["slow"]),
            other => panic!("expected grace exceeded, got {other:?}"),
        }
    }
}
