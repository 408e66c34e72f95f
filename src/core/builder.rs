use std::sync::Arc;

use crate::{
    core::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{alive::AliveTracker, host::Host};

/// Builder for constructing a [`Host`].
pub struct HostBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl HostBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event observers.
    ///
    /// Observers receive lifecycle events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the host and starts its event listener.
    ///
    /// Must be called inside a tokio runtime. The configuration is validated per bridge,
    /// in [`Host::spawn_bridge`].
    pub fn build(self) -> Arc<Host> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let alive = Arc::new(AliveTracker::new());

        let host = Arc::new(Host::new_internal(self.cfg, bus, subs, alive));
        host.spawn_listener();
        host
    }
}
