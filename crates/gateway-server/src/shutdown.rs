//! Shutdown signal handling.

use tokio::signal;
use tracing::{error, info};

/// Resolve when the process is asked to stop (Ctrl+C, SIGTERM or SIGQUIT)
///
/// Returns the name of the signal received. If a handler cannot be
/// installed the corresponding signal is never reported.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        "ctrl+c"
    };

    #[cfg(unix)]
    let unix = |kind: signal::unix::SignalKind, name: &'static str| async move {
        match signal::unix::signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(signal = name, error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
        name
    };

    #[cfg(unix)]
    let sigterm = unix(signal::unix::SignalKind::terminate(), "sigterm");
    #[cfg(unix)]
    let sigquit = unix(signal::unix::SignalKind::quit(), "sigquit");

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<&'static str>();
    #[cfg(not(unix))]
    let sigquit = std::future::pending::<&'static str>();

    let name = tokio::select! {
        name = ctrl_c => name,
        name = sigterm => name,
        name = sigquit => name,
    };

    info!(signal = name, "Received shutdown signal");
    name
}
