use crate::market::SnapshotUpdate;
use crate::market::fallback::ProviderChain;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::debug;

/// Owns a running refresh loop. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct RefreshHandle {
    id: String,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Stopping refresh for {}", self.id);
            task.abort();
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Re-queries `chain` for `id` every `period`, starting immediately, and
/// forwards each successful update on `tx`. Failed ticks are skipped.
pub fn spawn_refresh(
    chain: ProviderChain,
    id: String,
    period: Duration,
    tx: Sender<SnapshotUpdate>,
) -> RefreshHandle {
    let task_id = id.clone();
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match chain.refresh(&task_id).await {
                Ok(update) => {
                    if tx.send(update).await.is_err() {
                        debug!("Refresh receiver for {} closed", task_id);
                        return;
                    }
                }
                Err(e) => debug!("Refresh failed for {} (keeping last values): {}", task_id, e),
            }
        }
    });

    RefreshHandle { id, task: Some(task) }
}
