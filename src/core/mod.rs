//! Runtime core: bridge workers and the host that runs them.
//!
//! The public API from this module is [`Host`] (with [`HostBuilder`] and [`Config`]).
//!
//! Internal modules:
//! - [`pump`]: moves elements from the input buffer to the demand ledger;
//! - [`coordinator`]: one worker's state and its termination paths;
//! - [`actor`]: the task draining a worker mailbox, applying the restart policy;
//! - [`host`]: spawns workers, fans out events, graceful shutdown;
//! - [`alive`]: tracks which bridges are alive for the shutdown report;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod actor;
mod alive;
mod builder;
mod config;
mod coordinator;
mod host;
mod pump;
mod shutdown;

pub use builder::HostBuilder;
pub use config::Config;
pub use coordinator::Termination;
pub use host::Host;
