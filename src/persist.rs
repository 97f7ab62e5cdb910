use crate::state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Spawn a background task that periodically writes a state snapshot to `path`
pub fn spawn_snapshot_writer(
    state: Arc<AppState>,
    path: PathBuf,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick fires immediately; nothing has changed yet
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if let Err(e) = state.save_snapshot(&path).await {
                tracing::error!("Failed to write snapshot to {}: {}", path.display(), e);
            }
        }
    })
}
