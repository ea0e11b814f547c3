//! Background tasks for the Parley server.

use parley_agent::ConversationStore;
use tokio::time::{sleep, Duration};

/// Starts the conversation pruning task.
///
/// Runs indefinitely, dropping conversations that have been idle for longer
/// than the store's TTL every `interval_seconds`. An interval of `0` disables
/// the task; expired conversations are then only dropped when touched.
pub async fn start_session_prune_task(store: ConversationStore, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::warn!("conversation pruning task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, "starting conversation pruning task");

    loop {
        sleep(interval).await;

        let pruned = store.prune_expired();
        if pruned > 0 {
            tracing::info!(count = pruned, remaining = store.len(), "pruned idle conversations");
        } else {
            tracing::debug!("no idle conversations to prune");
        }
    }
}
