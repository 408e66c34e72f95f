//! Processor bridge: protocol-shaped handles in front of a worker mailbox.
//!
//! - [`ProcessorHandle`]: Publisher + Subscriber facade, one message per signal.
//! - [`ExposedPublisher`]: producer-role object with pending subscribers and the
//!   write-once shutdown reason.
//! - [`UpstreamSignal`] / [`DownstreamSignal`]: the mailbox vocabulary.

mod envelope;
mod exposed;
mod handle;
pub(crate) mod signal;

pub use envelope::{DownstreamSignal, UpstreamSignal};
pub use exposed::{ExposedPublisher, ShutdownReason};
pub use handle::ProcessorHandle;

pub(crate) use envelope::{Envelope, Mailbox, MailboxRx, WeakMailbox, mailbox};
pub(crate) use handle::DownstreamSubscription;
