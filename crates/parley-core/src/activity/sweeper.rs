//! Background sweep of expired activity records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::store::LocalActivityStore;
use crate::storage::kv_store::KvStore;

/// Spawn a task that purges expired records once immediately and then every
/// `interval`, until `cancel` fires.
pub fn spawn_sweeper<K>(
    store: Arc<LocalActivityStore<K>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    K: KvStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = store.sweep_expired().await;
                    debug!(removed, "Sweep pass finished");
                }
            }
        }
        debug!("Activity sweeper stopped");
    })
}
