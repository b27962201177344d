//! Shutdown signals for the serve loop.
//!
//! Ctrl+C (and SIGTERM on Unix) is the only path to a clean shutdown.

/// Resolves when the process is asked to stop.
///
/// A signal whose handler cannot be installed is logged and never fires, so
/// a broken handler cannot stop the server on its own.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(
                target: "docbench::signals",
                error = %err,
                "Could not listen for Ctrl+C"
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(
                    target: "docbench::signals",
                    error = %err,
                    "Could not listen for SIGTERM"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!(target: "docbench::signals", "Shutdown signal received");
}
