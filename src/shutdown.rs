//! Cancels the pending optimizer request when the runner interrupts the step.
//!
//! See: [`cancel_on_signal`]

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Returns a token that is cancelled once the process receives Ctrl + C or, on unix, `SIGTERM`.
///
/// Must be called from within a tokio runtime.
pub fn cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                warn!("received shutdown signal, cancelling the optimizer request…");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });

    token
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            debug!("failed to install Ctrl + C signal handler: {err}");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                debug!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_stays_live_without_signal() {
        let token = cancel_on_signal();
        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());

        // Cancelling from the caller side also ends the watcher task.
        token.cancel();
        assert!(token.is_cancelled());
    }
}
