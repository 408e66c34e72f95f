//! Termination signal used by [`Host::run_until_signal`](crate::Host::run_until_signal).
//!
//! On unix any of SIGINT, SIGTERM or SIGQUIT stops the host; elsewhere only Ctrl-C.
//! Registration failures are returned instead of being treated as a signal, so the
//! caller decides whether a host that cannot listen should keep running.

use std::io;

/// Resolves on the first termination signal delivered to the process.
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut streams = [
            signal(SignalKind::interrupt())?,
            signal(SignalKind::terminate())?,
            signal(SignalKind::quit())?,
        ];
        let [interrupt, terminate, quit] = &mut streams;
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
            _ = quit.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
