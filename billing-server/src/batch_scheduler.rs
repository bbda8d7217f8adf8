use std::sync::Arc;
use std::time::Duration;

use billing_logic::batch::DelinquencyBatch;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawns the delinquency batch on its configured cron schedule. The
/// returned handle resolves once `shutdown` flips to true and the
/// in-flight run (if any) finishes.
pub fn spawn(
    batch: Arc<DelinquencyBatch>,
    cron_expr: String,
    timeout_secs: u64,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = batch
            .run_scheduled(&cron_expr, Duration::from_secs(timeout_secs), shutdown)
            .await
        {
            tracing::error!(error = %err, "delinquency batch scheduler exited with an error");
        }
    })
}
