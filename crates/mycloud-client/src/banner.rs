//! Transient session error banner.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mycloud_shared::constants::BANNER_TTL_SECS;

use crate::state::SessionAction;
use crate::store::Store;

pub const BANNER_TTL: Duration = Duration::from_secs(BANNER_TTL_SECS);

/// Message to show right now, if any.
pub fn current(store: &Store) -> Option<String> {
    store.session().error
}

/// Clear the session error after `ttl`, unless it changed in the meantime.
///
/// Resolves to `true` when the banner was dismissed by this task.
pub fn spawn_auto_dismiss(store: Store, ttl: Duration, cancel: CancellationToken) -> Option<JoinHandle<bool>> {
    let shown = current(&store)?;

    Some(tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(ttl) => {
                let mut dismissed = false;
                store.dispatch(|s| {
                    if s.session.error.as_deref() == Some(shown.as_str()) {
                        s.session.reduce(SessionAction::ClearError);
                        dismissed = true;
                    }
                });
                dismissed
            }
        }
    }))
}
