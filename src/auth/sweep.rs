//! Out-of-band garbage collection of expired refresh tokens.

use super::traits::RefreshTokenStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delete expired refresh tokens once. Returns how many rows were removed.
pub async fn sweep_once(store: &dyn RefreshTokenStore) -> Result<u64> {
    let removed = store.purge_expired().await?;
    if removed > 0 {
        tracing::info!(removed, "Purged expired refresh tokens");
    } else {
        tracing::debug!("No expired refresh tokens to purge");
    }
    Ok(removed)
}

/// Run [`sweep_once`] on a fixed interval until the task is aborted.
///
/// The first sweep happens immediately. Failures are logged and retried on the
/// next tick.
pub fn spawn_sweeper(store: Arc<dyn RefreshTokenStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = sweep_once(store.as_ref()).await {
                tracing::warn!("Refresh token sweep failed: {e:#}");
            }
        }
    })
}
