//! # Restart policy applied by the host after a fatal invariant violation.
//!
//! A bridge holds buffered elements and outstanding demand that cannot be carried
//! across a restart, so a restart never succeeds. The policy only decides whether the
//! host *attempts* one:
//!
//! ```text
//! invariant violation
//!   ├─ RestartPolicy::Never     ─► fail(cause)                     ─► BridgeFailed
//!   └─ RestartPolicy::OnFailure ─► pre_restart(cause) ─► fail(cause) ─► BridgeFailed
//!                                                     └─► RestartRejected
//! ```
//!
//! Protocol violations, upstream failures and cancellation never reach this policy:
//! they terminate the bridge through its regular failure path.

/// Policy controlling whether the host attempts to restart a crashed bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Stop the bridge without attempting a restart.
    Never,
    /// Attempt a restart; the bridge refuses and dies (default).
    #[default]
    OnFailure,
}
