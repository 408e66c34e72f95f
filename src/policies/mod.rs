//! Host policies.
//!
//! - [`RestartPolicy`] decides whether the host attempts to restart a crashed bridge.

mod restart;

pub use restart::RestartPolicy;
