//! # Host and bridge configuration.
//!
//! Provides [`Config`], centralized settings consumed by [`Host`](crate::Host) and by
//! every bridge it spawns.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `grace = 0s` → shutdown does not wait for workers

use std::time::Duration;

use crate::error::BridgeError;
use crate::policies::RestartPolicy;

/// Global configuration.
///
/// ## Field semantics
/// - `buffer_capacity`: input ring size per bridge (non-zero power of two)
/// - `debug`: publish per-element and per-request diagnostic events (no behavioral effect)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: maximum wait for bridges to stop during shutdown
/// - `restart`: what the host does after a fatal invariant violation
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of each bridge's input buffer.
    ///
    /// Also the size of the initial upstream request; re-requests are issued in
    /// batches of half this value (minimum 1).
    pub buffer_capacity: usize,

    /// Emit `DemandRequested`, `BatchRequested` and `ElementEmitted` events.
    pub debug: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Maximum time to wait for bridges to stop during shutdown.
    pub grace: Duration,

    /// Restart behavior after a fatal invariant violation.
    ///
    /// Bridges never resume; with [`RestartPolicy::OnFailure`] the attempt is made and
    /// refused, which is reported as `RestartRejected`.
    pub restart: RestartPolicy,
}

impl Config {
    /// Checks values that cannot be clamped.
    ///
    /// # Errors
    /// [`BridgeError::InvalidCapacity`] unless `buffer_capacity` is a non-zero power of two.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.buffer_capacity.is_power_of_two() {
            Ok(())
        } else {
            Err(BridgeError::InvalidCapacity {
                capacity: self.buffer_capacity,
            })
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `buffer_capacity = 16`
    /// - `debug = false`
    /// - `bus_capacity = 1024`
    /// - `grace = 60s`
    /// - `restart = RestartPolicy::OnFailure`
    fn default() -> Self {
        Self {
            buffer_capacity: 16,
            debug: false,
            bus_capacity: 1024,
            grace: Duration::from_secs(60),
            restart: RestartPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn capacity_must_be_power_of_two() {
        let cfg = Config {
            buffer_capacity: 12,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(BridgeError::InvalidCapacity { capacity: 12 })
        );
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
