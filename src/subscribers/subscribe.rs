//! # Core observer trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into the
//! host. Each observer is driven by a dedicated worker loop fed by a bounded queue
//! owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! Not to be confused with the stream [`Subscriber`](crate::Subscriber): observers see
//! lifecycle [`Event`]s, never stream elements.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block bridge workers
//!   nor other observers.
//! - Each observer declares its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow, events for that observer are **dropped**
//!   and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use streambridge::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::BridgeFailed {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event observers.
///
/// Called from an observer-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this observer's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
