//! # Event observers for the bridge host.
//!
//! Observers receive lifecycle [`Event`](crate::Event)s published on the
//! [`Bus`](crate::events::Bus) and fanned out by the host.
//!
//! ```text
//! BridgeActor ── publish(Event) ──► Bus ──► Host listener ──┬──► AliveTracker (internal)
//!                                                           └──► SubscriberSet::emit()
//!                                                                  ├──► LogWriter
//!                                                                  └──► custom ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
