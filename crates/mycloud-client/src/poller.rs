//! Background refresh of the signed-in account's storage usage.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use mycloud_shared::constants::QUOTA_POLL_INTERVAL_SECS;

use crate::store::Store;

pub const QUOTA_POLL_INTERVAL: Duration = Duration::from_secs(QUOTA_POLL_INTERVAL_SECS);

/// Refresh the current user every few seconds until `cancel` fires.
pub fn spawn_quota_poller(store: Store, cancel: CancellationToken) -> JoinHandle<()> {
    spawn_poller_every(store, QUOTA_POLL_INTERVAL, cancel)
}

/// Like [`spawn_quota_poller`] with an explicit period.
///
/// The loop also ends once the stored credential is gone, since every
/// further request would be rejected.
pub fn spawn_poller_every(store: Store, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !store.vault().has_token() {
                info!("No credential left, stopping quota poller");
                break;
            }
            if let Err(e) = store.fetch_current_user(&cancel).await {
                debug!(error = %e, "Quota refresh failed");
            }
        }
    })
}
