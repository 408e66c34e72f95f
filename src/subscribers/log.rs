//! # Logging observer built on `tracing`.
//!
//! [`LogWriter`] renders every event as one `tracing` record with structured fields.
//! Lifecycle events log at `info`, failures at `warn`, flow-control diagnostics at
//! `debug`. Install any `tracing` subscriber (e.g. `tracing-subscriber`) to see them.
//!
//! ## Output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO  bridge="orders" capacity=16 started
//! INFO  bridge="orders" demand=16 upstream subscribed
//! DEBUG bridge="orders" demand=3 demand requested
//! WARN  bridge="orders" label="upstream" reason="upstream failed: eof" bridge failed
//! INFO  shutdown requested
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Observer forwarding events to `tracing`.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let bridge = e.bridge.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::BridgeStarted => {
                info!(bridge, capacity = ?e.capacity, seq = e.seq, "started");
            }
            EventKind::UpstreamSubscribed => {
                info!(bridge, demand = ?e.demand, "upstream subscribed");
            }
            EventKind::DownstreamSubscribed => info!(bridge, "downstream subscribed"),
            EventKind::UpstreamCompleted => info!(bridge, "upstream completed"),
            EventKind::DownstreamCancelled => info!(bridge, "downstream cancelled"),
            EventKind::BridgeFinished => info!(bridge, seq = e.seq, "finished"),
            EventKind::SubscriberRejected => warn!(bridge, reason, "subscriber rejected"),
            EventKind::UpstreamFailed | EventKind::BridgeFailed | EventKind::RestartRejected => {
                warn!(bridge, label = ?e.label, reason, kind = ?e.kind, "bridge failed");
            }
            EventKind::BridgeAborted => warn!(bridge, "aborted"),
            EventKind::DemandRequested => debug!(bridge, demand = ?e.demand, "demand requested"),
            EventKind::BatchRequested => debug!(bridge, demand = ?e.demand, "batch requested"),
            EventKind::ElementEmitted => debug!(bridge, outstanding = ?e.demand, "element emitted"),
            EventKind::SubscriberPanicked => warn!(observer = bridge, reason, "observer panicked"),
            EventKind::SubscriberOverflow => warn!(observer = bridge, reason, "observer overflow"),
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStoppedWithin => info!("all bridges stopped within grace"),
            EventKind::GraceExceeded => warn!("grace exceeded"),
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
