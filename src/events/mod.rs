//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the host and bridge workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Host`, `BridgeActor`, `Coordinator`, `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the host's event listener (fans out to `SubscriberSet` and updates
//!   `AliveTracker`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
