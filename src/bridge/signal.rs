//! Panic-isolated delivery of signals to external protocol parties.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::BridgeError;
use crate::protocol::{CancelledSubscription, Subscriber};

/// Runs one callback into a protocol party, converting a panic into
/// [`BridgeError::SignalPanicked`].
///
/// **Warning**: `AssertUnwindSafe` is used; a party that panics while holding its own
/// lock may leave that state poisoned. The bridge never touches that state again.
pub(crate) fn try_signal(signal: &'static str, f: impl FnOnce()) -> Result<(), BridgeError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|panic| BridgeError::SignalPanicked {
        signal,
        info: panic_info(panic.as_ref()),
    })
}

/// Refuses a subscriber: a cancelled subscription first, then the terminal error.
///
/// Panics raised by the rejected party are swallowed; it is not served either way.
pub(crate) fn reject<T: 'static>(subscriber: &Arc<dyn Subscriber<T>>, cause: BridgeError) {
    let rejected = try_signal("on_subscribe", || {
        subscriber.on_subscribe(CancelledSubscription::arc())
    });
    if rejected.is_ok() {
        let _ = try_signal("on_error", || subscriber.on_error(cause));
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_info(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_becomes_signal_panicked() {
        let res = try_signal("on_next", || panic!("boom"));
        assert_eq!(
            res,
            Err(BridgeError::SignalPanicked {
                signal: "on_next",
                info: "boom".into()
            })
        );
    }

    #[test]
    fn formatted_panic_payload_is_kept() {
        let n = 3;
        let res = try_signal("on_complete", || panic!("bad {n}"));
        assert!(matches!(
            res,
            Err(BridgeError::SignalPanicked { info, .. }) if info == "bad 3"
        ));
    }
}
