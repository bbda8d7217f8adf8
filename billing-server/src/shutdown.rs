use std::time::Duration;

use tokio::sync::watch;

/// Listens for SIGINT/SIGTERM and flips the shared `shutdown` watch so
/// every long-running task (the batch scheduler, the HTTP server) can
/// wind down on its own schedule, per the sequencing in spec §5.
pub async fn wait_for_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, beginning graceful shutdown");
    let _ = shutdown_tx.send(true);
}

/// Waits up to `grace` for `handle` to finish; logs and moves on if it
/// doesn't, so a stuck task never blocks process exit indefinitely.
pub async fn wait_with_grace<T>(name: &str, handle: tokio::task::JoinHandle<T>, grace: Duration) {
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(_)) => tracing::info!(task = name, "shut down cleanly"),
        Ok(Err(err)) => tracing::error!(task = name, error = %err, "task panicked during shutdown"),
        Err(_) => tracing::warn!(task = name, grace_secs = grace.as_secs(), "did not shut down within grace period"),
    }
}
